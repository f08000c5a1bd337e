use tracing::{error, info};

use board_client::{BoardClient, Config};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = board_client::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        board_client::logging::init_console_only(&config.logging.level);
    }

    let client = match BoardClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to start client: {e}");
            std::process::exit(1);
        }
    };

    match client.session().user() {
        Some(user) => info!("Signed in as {} ({})", user.name, user.username),
        None => info!("No saved session"),
    }

    match client.posts().list_posts(0, 10).await {
        Ok(page) => {
            info!(
                "Page {} of {} ({} posts)",
                page.number + 1,
                page.total_pages,
                page.total_elements
            );
            for post in &page.content {
                let category = post.category().map(|c| c.label()).unwrap_or("-");
                info!("#{} [{}] {}", post.id, category, post.title);
            }
        }
        Err(e) if e.requires_signin() => info!("Sign in to browse posts: {e}"),
        Err(e) => error!("Failed to list posts: {e}"),
    }
}
