// Recipe Cart GUI - Main Entry Point
// Native grocery storefront with a recipe shopping assistant

mod catalog;
mod chat;
mod config;
mod state;
mod ui;

use catalog::{CatalogClient, Category, Product};
use chat::{ChatCommand, ChatHandle};
use config::Config;
use eframe::egui;
use state::{AppState, RequestId};
use std::sync::mpsc;
use tracing::{info, warn};
use ui::{render_app_layout, UiAction};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    // Network work runs here; the UI thread only polls results
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("recipe-cart-io")
        .build()?;
    let catalog = CatalogClient::new(config.catalog_api_url.clone())?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Recipe Cart")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Recipe Cart",
        options,
        Box::new(move |cc| {
            let mut app = RecipeCartApp::new(config, runtime, catalog, cc.egui_ctx.clone());
            app.load_catalog();
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUI failed: {}", e))
}

/// Result of a background catalog request
enum CatalogUpdate {
    Products(RequestId, Result<Vec<Product>, String>),
    Categories(Result<Vec<Category>, String>),
}

/// Main application struct
/// Owns view state, the catalog client and the chat driver handle
struct RecipeCartApp {
    config: Config,
    state: AppState,
    /// Chat driver; present while the chat window is open
    chat: Option<ChatHandle>,
    catalog: CatalogClient,
    updates_tx: mpsc::Sender<CatalogUpdate>,
    updates_rx: mpsc::Receiver<CatalogUpdate>,
    ctx: egui::Context,
    runtime: tokio::runtime::Runtime,
}

impl RecipeCartApp {
    /// Create a new application instance
    fn new(
        config: Config,
        runtime: tokio::runtime::Runtime,
        catalog: CatalogClient,
        ctx: egui::Context,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel();
        Self {
            config,
            state: AppState::new(),
            chat: None,
            catalog,
            updates_tx,
            updates_rx,
            ctx,
            runtime,
        }
    }

    /// Fetch categories and the first page of products
    fn load_catalog(&mut self) {
        let client = self.catalog.clone();
        let tx = self.updates_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let result = client.fetch_categories().await.map_err(|e| e.to_string());
            let _ = tx.send(CatalogUpdate::Categories(result));
            ctx.request_repaint();
        });
        self.fetch_products();
    }

    /// Fetch products for the current filters
    fn fetch_products(&mut self) {
        let request = self.state.begin_request();
        let client = self.catalog.clone();
        let query = self.state.active_query.clone();
        let category = self.state.selected_category.clone();
        let tx = self.updates_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            let result = client
                .fetch_products(query.as_deref(), category.as_deref())
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(CatalogUpdate::Products(request, result));
            ctx.request_repaint();
        });
    }

    /// Apply finished catalog requests
    fn poll_updates(&mut self) {
        while let Ok(update) = self.updates_rx.try_recv() {
            match update {
                CatalogUpdate::Products(request, result) => {
                    if let Err(e) = &result {
                        warn!(error = %e, "Failed to load products");
                    }
                    self.state.apply_products(request, result);
                }
                CatalogUpdate::Categories(result) => {
                    if let Err(e) = &result {
                        warn!(error = %e, "Failed to load categories");
                    }
                    self.state.apply_categories(result);
                }
            }
        }
    }

    /// Open the chat window, starting a fresh conversation
    fn open_chat(&mut self) {
        if self.chat.is_none() {
            let ctx = self.ctx.clone();
            let handle = ChatHandle::spawn(
                self.runtime.handle(),
                self.config.chat_config(),
                move || ctx.request_repaint(),
            );
            if let Some(identity) = &self.config.identity {
                handle.send(ChatCommand::SetIdentity(Some(identity.clone())));
            }
            handle.send(ChatCommand::Open);
            self.chat = Some(handle);
        }
        self.state.ui_state.chat_open = true;
    }

    /// Close the chat window and tear its connection down
    fn close_chat(&mut self) {
        if let Some(mut handle) = self.chat.take() {
            handle.send(ChatCommand::Close);
            handle.shutdown();
        }
        self.state.ui_state.chat_open = false;
        self.state.chat_input.clear();
    }

    fn handle_action(&mut self, action: UiAction) {
        match action {
            UiAction::ReloadProducts => self.fetch_products(),
            UiAction::OpenChat => self.open_chat(),
            UiAction::CloseChat => self.close_chat(),
            UiAction::SendChat(text) => {
                if let Some(chat) = &self.chat {
                    chat.send(ChatCommand::Submit(text));
                }
            }
            UiAction::Reconnect => {
                if let Some(chat) = &self.chat {
                    chat.send(ChatCommand::Reconnect);
                }
            }
        }
    }
}

impl eframe::App for RecipeCartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_updates();
        let snapshot = self.chat.as_ref().map(|chat| chat.snapshot());
        let actions = render_app_layout(ctx, &mut self.state, snapshot.as_ref());
        for action in actions {
            self.handle_action(action);
        }
    }
}
