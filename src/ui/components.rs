// Reusable UI components
// Status badge, product card and chat bubble

use crate::catalog::Product;
use crate::chat::{ChatMessage, ChatStatus, MessageRole};
use eframe::egui;

/// Greeting shown while the conversation is empty
pub const GREETING: &str = "Hi! I'm your recipe shopping assistant. Tell me what you'd like to cook and I'll find the ingredients.";

/// Render a connection badge with colored text
/// Colors: Connected (green), Reconnecting (yellow), Disconnected (red)
pub fn status_badge(ui: &mut egui::Ui, status: ChatStatus) {
    let (text, text_color) = match status {
        ChatStatus::Connected => ("● Connected", egui::Color32::from_rgb(0, 200, 0)),
        ChatStatus::Reconnecting => ("● Reconnecting...", egui::Color32::from_rgb(220, 180, 0)),
        ChatStatus::Disconnected => ("● Disconnected", egui::Color32::from_rgb(220, 0, 0)),
    };

    ui.colored_label(text_color, text);
}

/// Render a primary action button
pub fn primary_button(ui: &mut egui::Ui, text: &str) -> egui::Response {
    ui.button(egui::RichText::new(text).strong())
}

/// Render a product card
/// Returns true if the nutrition toggle was clicked
pub fn product_card(ui: &mut egui::Ui, product: &Product, nutrition_open: bool) -> bool {
    let mut toggled = false;
    egui::Frame::group(ui.style())
        .rounding(egui::Rounding::same(6.0))
        .inner_margin(egui::Margin::same(10.0))
        .show(ui, |ui| {
            ui.set_width(220.0);
            ui.vertical(|ui| {
                if let Some(brand) = &product.brand {
                    ui.label(egui::RichText::new(brand).weak().small());
                }
                ui.label(egui::RichText::new(&product.item_name).strong().size(15.0));
                ui.label(egui::RichText::new(product.pack_size()).weak());
                ui.add_space(6.0);

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(format!("${:.2}", product.price)).heading());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if product.in_stock() {
                            ui.colored_label(
                                egui::Color32::from_rgb(0, 160, 0),
                                format!("{} in stock", product.stock_quantity),
                            );
                        } else {
                            ui.colored_label(egui::Color32::from_rgb(220, 0, 0), "Out of stock");
                        }
                    });
                });

                if let Some(category) = &product.category {
                    ui.label(egui::RichText::new(category).small().italics());
                }

                if product.has_nutrition() {
                    ui.add_space(4.0);
                    let label = if nutrition_open {
                        "▾ Nutrition"
                    } else {
                        "▸ Nutrition"
                    };
                    if ui.small_button(label).clicked() {
                        toggled = true;
                    }
                    if nutrition_open {
                        nutrition_table(ui, product);
                    }
                }

                if let Some(allergens) = product.allergens.as_deref().filter(|a| *a != "None") {
                    ui.label(egui::RichText::new(allergens).small().weak());
                }
            });
        });
    toggled
}

fn nutrition_table(ui: &mut egui::Ui, product: &Product) {
    egui::Grid::new(("nutrition", product.id))
        .num_columns(2)
        .spacing([12.0, 2.0])
        .show(ui, |ui| {
            if let Some(kcal) = product.calories_per_100g {
                ui.label("Calories");
                ui.label(format!("{} kcal", kcal));
                ui.end_row();
            }
            let grams = [
                ("Protein", product.protein_g),
                ("Fat", product.fat_g),
                ("Carbs", product.carbs_g),
                ("Sugar", product.sugar_g),
            ];
            for (name, value) in grams {
                if let Some(value) = value {
                    ui.label(name);
                    ui.label(format!("{:.1} g", value));
                    ui.end_row();
                }
            }
        });
}

/// Render one chat bubble with its time
pub fn message_bubble(ui: &mut egui::Ui, message: &ChatMessage) {
    bubble(
        ui,
        message.role(),
        message.content(),
        Some(message.timestamp().format("%H:%M").to_string()),
    );
}

/// Render the greeting placeholder
pub fn greeting_bubble(ui: &mut egui::Ui) {
    bubble(ui, MessageRole::Assistant, GREETING, None);
}

fn bubble(ui: &mut egui::Ui, role: MessageRole, content: &str, time: Option<String>) {
    let is_user = role == MessageRole::User;
    let layout = if is_user {
        egui::Layout::right_to_left(egui::Align::TOP)
    } else {
        egui::Layout::left_to_right(egui::Align::TOP)
    };

    ui.with_layout(layout, |ui| {
        let fill = if is_user {
            ui.visuals().selection.bg_fill
        } else {
            ui.visuals().extreme_bg_color
        };
        egui::Frame::none()
            .fill(fill)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0))
            .show(ui, |ui| {
                ui.set_max_width(280.0);
                ui.vertical(|ui| {
                    ui.label(content);
                    if let Some(time) = time {
                        ui.label(egui::RichText::new(time).small().weak());
                    }
                });
            });
    });
    ui.add_space(6.0);
}
