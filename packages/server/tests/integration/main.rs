
mod catalog;
mod recipes;
