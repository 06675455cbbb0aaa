// Main application layout
// Handles window layout, panels, menu bar, and the chat window

use crate::chat::{ChatSnapshot, ChatStatus};
use crate::state::AppState;
use crate::ui::components::*;
use eframe::egui;

/// Something the user asked for that needs work outside the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Filters changed; fetch products again
    ReloadProducts,
    /// Chat window opened
    OpenChat,
    /// Chat window closed
    CloseChat,
    /// Send a chat message
    SendChat(String),
    /// Manual reconnect
    Reconnect,
}

/// Render the main application layout
/// Includes menu bar, category sidebar, product grid and the chat window
pub fn render_app_layout(
    ctx: &egui::Context,
    state: &mut AppState,
    chat: Option<&ChatSnapshot>,
) -> Vec<UiAction> {
    let mut actions = Vec::new();

    render_menu_bar(ctx, state, &mut actions);

    if state.ui_state.sidebar_visible {
        render_sidebar(ctx, state, &mut actions);
    }

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.add_space(8.0);
        render_search_bar(ui, state, &mut actions);
        ui.add_space(8.0);
        ui.separator();
        ui.add_space(8.0);
        render_product_grid(ui, state);
    });

    if state.ui_state.chat_open {
        if let Some(snapshot) = chat {
            render_chat_window(ctx, state, snapshot, &mut actions);
        }
    }

    actions
}

/// Render the top menu bar
fn render_menu_bar(ctx: &egui::Context, state: &mut AppState, actions: &mut Vec<UiAction>) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Refresh catalog").clicked() {
                    actions.push(UiAction::ReloadProducts);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                let mut dark_mode = ctx.style().visuals.dark_mode;
                if ui.checkbox(&mut dark_mode, "Dark Mode").changed() {
                    ctx.set_visuals(if dark_mode {
                        egui::Visuals::dark()
                    } else {
                        egui::Visuals::light()
                    });
                }
                ui.checkbox(&mut state.ui_state.sidebar_visible, "Categories");
                ui.separator();
                let mut chat_open = state.ui_state.chat_open;
                if ui.checkbox(&mut chat_open, "Shopping assistant").changed() {
                    actions.push(if chat_open {
                        UiAction::OpenChat
                    } else {
                        UiAction::CloseChat
                    });
                    ui.close_menu();
                }
            });
        });
    });
}

/// Render the left sidebar with the category list
fn render_sidebar(ctx: &egui::Context, state: &mut AppState, actions: &mut Vec<UiAction>) {
    egui::SidePanel::left("category_sidebar")
        .resizable(true)
        .default_width(200.0)
        .min_width(150.0)
        .show(ctx, |ui| {
            ui.add_space(8.0);
            ui.heading("Categories");
            ui.add_space(4.0);
            ui.separator();
            ui.add_space(4.0);

            egui::ScrollArea::vertical()
                .id_source("category_scroll")
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let mut choice = None;
                    if ui
                        .selectable_label(state.selected_category.is_none(), "All products")
                        .clicked()
                    {
                        choice = Some(None);
                    }
                    for category in &state.categories {
                        let selected = state.selected_category.as_deref() == Some(category.name.as_str());
                        if ui.selectable_label(selected, &category.name).clicked() {
                            choice = Some(Some(category.name.clone()));
                        }
                    }
                    if state.categories.is_empty() {
                        ui.add_space(16.0);
                        ui.label(egui::RichText::new("No categories loaded").italics().weak());
                    }

                    if let Some(category) = choice {
                        if state.select_category(category) {
                            actions.push(UiAction::ReloadProducts);
                        }
                    }
                });
        });
}

/// Render the search row
fn render_search_bar(ui: &mut egui::Ui, state: &mut AppState, actions: &mut Vec<UiAction>) {
    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut state.search_input)
                .hint_text("Search products, brands or categories")
                .desired_width(320.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if (primary_button(ui, "Search").clicked() || submitted) && state.apply_search() {
            actions.push(UiAction::ReloadProducts);
        }
        if ui.button("Clear").clicked() && state.clear_search() {
            actions.push(UiAction::ReloadProducts);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if !state.ui_state.chat_open && primary_button(ui, "💬 Ask the assistant").clicked() {
                actions.push(UiAction::OpenChat);
            }
        });
    });
}

/// Render the product grid
fn render_product_grid(ui: &mut egui::Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.heading(state.grid_title());
        if state.loading {
            ui.spinner();
        } else {
            ui.label(egui::RichText::new(format!("{} items", state.products.len())).weak());
        }
    });
    if let Some(error) = &state.error {
        ui.colored_label(egui::Color32::RED, error);
    }
    ui.add_space(8.0);

    let mut toggled = None;
    egui::ScrollArea::vertical()
        .id_source("product_scroll")
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            if state.products.is_empty() && !state.loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.label(egui::RichText::new("No products found").italics().weak().size(14.0));
                });
                return;
            }
            ui.horizontal_wrapped(|ui| {
                ui.spacing_mut().item_spacing = egui::vec2(12.0, 12.0);
                for product in &state.products {
                    if product_card(ui, product, state.nutrition_expanded(product.id)) {
                        toggled = Some(product.id);
                    }
                }
            });
        });

    if let Some(id) = toggled {
        state.toggle_nutrition(id);
    }
}

/// Render the shopping assistant window
fn render_chat_window(
    ctx: &egui::Context,
    state: &mut AppState,
    chat: &ChatSnapshot,
    actions: &mut Vec<UiAction>,
) {
    let mut open = true;
    egui::Window::new("Recipe Shopping Assistant")
        .open(&mut open)
        .default_size([380.0, 520.0])
        .resizable(true)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                status_badge(ui, chat.status);
                if chat.status != ChatStatus::Connected {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add_enabled(chat.reconnect_enabled, egui::Button::new("Reconnect"))
                            .clicked()
                        {
                            actions.push(UiAction::Reconnect);
                        }
                    });
                }
            });
            if chat.status == ChatStatus::Reconnecting && chat.attempt_count > 0 {
                ui.label(
                    egui::RichText::new(format!("Retry attempt {}", chat.attempt_count))
                        .small()
                        .weak(),
                );
            } else if chat.retries_exhausted {
                let detail = match chat.last_close_code {
                    Some(code) => format!("Gave up reconnecting (close code {})", code),
                    None => "Gave up reconnecting".to_string(),
                };
                ui.label(egui::RichText::new(detail).small().weak());
            }
            if chat.dropped_frames > 0 {
                ui.label(
                    egui::RichText::new(format!(
                        "{} unreadable replies skipped",
                        chat.dropped_frames
                    ))
                    .small()
                    .weak(),
                );
            }
            ui.separator();

            let input_height = 64.0;
            egui::ScrollArea::vertical()
                .id_source("chat_scroll")
                .max_height((ui.available_height() - input_height).max(120.0))
                .auto_shrink([false; 2])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    if chat.messages.is_empty() {
                        greeting_bubble(ui);
                    }
                    for message in &chat.messages {
                        message_bubble(ui, message);
                    }
                    if chat.awaiting_reply {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(egui::RichText::new("Thinking...").italics().weak());
                        });
                    }
                });

            ui.separator();
            let can_send = chat.status == ChatStatus::Connected && !chat.awaiting_reply;
            ui.horizontal(|ui| {
                let input_width = ui.available_width() - 60.0;
                let response = ui.add(
                    egui::TextEdit::singleline(&mut state.chat_input)
                        .hint_text("Ask for a recipe's ingredients...")
                        .desired_width(input_width),
                );
                let entered =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                let has_text = !state.chat_input.trim().is_empty();
                let clicked = ui
                    .add_enabled(can_send && has_text, egui::Button::new("Send"))
                    .clicked();
                if (clicked || entered) && can_send && has_text {
                    actions.push(UiAction::SendChat(std::mem::take(&mut state.chat_input)));
                    response.request_focus();
                }
            });
            if let Some(error) = &chat.last_error {
                ui.colored_label(egui::Color32::RED, error);
            }
        });

    if !open {
        actions.push(UiAction::CloseChat);
    }
}
