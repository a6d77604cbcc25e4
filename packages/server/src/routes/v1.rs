use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/tags", tag_routes())
        .nest("/ingredients", ingredient_routes())
        .nest("/recipes", recipe_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::auth::login))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::user::list_users,
            handlers::user::register
        ))
        .routes(routes!(handlers::user::me))
        .routes(routes!(handlers::user::set_password))
        .routes(routes!(handlers::user::list_subscriptions))
        .routes(routes!(handlers::user::get_user))
        .routes(routes!(
            handlers::user::subscribe,
            handlers::user::unsubscribe
        ))
}

fn tag_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::catalog::list_tags))
        .routes(routes!(handlers::catalog::get_tag))
}

fn ingredient_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::catalog::list_ingredients))
        .routes(routes!(handlers::catalog::get_ingredient))
}

fn recipe_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::recipe::list_recipes,
            handlers::recipe::create_recipe
        ))
        .routes(routes!(handlers::recipe::download_shopping_cart))
        .routes(routes!(
            handlers::recipe::get_recipe,
            handlers::recipe::update_recipe,
            handlers::recipe::delete_recipe
        ))
        .routes(routes!(
            handlers::recipe::add_favorite,
            handlers::recipe::remove_favorite
        ))
        .routes(routes!(
            handlers::recipe::add_to_shopping_cart,
            handlers::recipe::remove_from_shopping_cart
        ))
}
