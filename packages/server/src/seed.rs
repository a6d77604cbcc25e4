use std::path::Path;

use sea_orm::*;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::entity::{ingredient, tag};

const TAGS_FILE: &str = "tags.json";
const INGREDIENTS_FILE: &str = "ingredients.json";
const INSERT_CHUNK: usize = 1000;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagSeed {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngredientSeed {
    pub name: String,
    pub measurement_unit: String,
}

/// Read a JSON array file. A missing file yields `None`.
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<Vec<T>>, SeedError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SeedError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| SeedError::Parse {
            path: path.display().to_string(),
            source,
        })
}

/// Insert tags, skipping any whose slug already exists. Returns the number inserted.
pub async fn seed_tags<C: ConnectionTrait>(db: &C, tags: &[TagSeed]) -> Result<u32, DbErr> {
    let mut inserted = 0u32;
    for seed in tags {
        let model = tag::ActiveModel {
            name: Set(seed.name.clone()),
            color: Set(seed.color.clone()),
            slug: Set(seed.slug.clone()),
            ..Default::default()
        };

        let result = tag::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(tag::Column::Slug)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(0) | Err(DbErr::RecordNotInserted) => {}
            Ok(_) => inserted += 1,
            Err(e) => return Err(e),
        }
    }
    Ok(inserted)
}

/// Bulk-load ingredients into an empty table. Returns the number inserted (0 if already populated).
pub async fn seed_ingredients<C: ConnectionTrait>(
    db: &C,
    ingredients: &[IngredientSeed],
) -> Result<u64, DbErr> {
    if ingredient::Entity::find().count(db).await? > 0 {
        return Ok(0);
    }

    let mut inserted = 0u64;
    for chunk in ingredients.chunks(INSERT_CHUNK) {
        let models = chunk.iter().map(|seed| ingredient::ActiveModel {
            name: Set(seed.name.clone()),
            measurement_unit: Set(seed.measurement_unit.clone()),
            ..Default::default()
        });
        inserted += ingredient::Entity::insert_many(models)
            .exec_without_returning(db)
            .await?;
    }
    Ok(inserted)
}

/// Load `tags.json` and `ingredients.json` from `dir`.
pub async fn import_reference_data(db: &DatabaseConnection, dir: &Path) -> Result<(), SeedError> {
    let tags_path = dir.join(TAGS_FILE);
    match read_json::<TagSeed>(&tags_path)? {
        Some(tags) => {
            let inserted = seed_tags(db, &tags).await?;
            if inserted > 0 {
                info!("Seeded {} new tags", inserted);
            }
        }
        None => warn!(path = %tags_path.display(), "Tag seed file not found, skipping"),
    }

    let ingredients_path = dir.join(INGREDIENTS_FILE);
    match read_json::<IngredientSeed>(&ingredients_path)? {
        Some(ingredients) => {
            let inserted = seed_ingredients(db, &ingredients).await?;
            if inserted > 0 {
                info!("Seeded {} ingredients", inserted);
            }
        }
        None => warn!(
            path = %ingredients_path.display(),
            "Ingredient seed file not found, skipping"
        ),
    }

    Ok(())
}
