//! Catalog tools offered to the assistant model
//!
//! Read-only lookups the model may call while walking a shopper through a
//! recipe. Every tool answers with a JSON string, failures included, so the
//! model always gets something it can talk about.

use crate::assistant::completion::{ChatTurn, CompletionClient, ToolCall, ToolDefinition, TurnRole};
use crate::catalog::{CatalogDb, Product};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Splits a recipe request into its ingredient list
pub const EXTRACT_RECIPE_INGREDIENTS: &str = "extract_recipe_ingredients";
/// Finds catalog products matching one ingredient
pub const CHECK_INGREDIENT_AVAILABILITY: &str = "check_ingredient_availability";
/// Finds in-stock substitutes
pub const SEARCH_ALTERNATIVES: &str = "search_alternatives";
/// Detailed rows for a set of SKUs
pub const GET_PRODUCT_DETAILS_FOR_COMPARISON: &str = "get_product_details_for_comparison";
/// Nutrition facts for a set of SKUs
pub const GET_NUTRITION_COMPARISON: &str = "get_nutrition_comparison";

/// Maximum substitutes returned by `search_alternatives`
pub const ALTERNATIVES_LIMIT: i64 = 5;

const TOOL_NAMES: [&str; 5] = [
    EXTRACT_RECIPE_INGREDIENTS,
    CHECK_INGREDIENT_AVAILABILITY,
    SEARCH_ALTERNATIVES,
    GET_PRODUCT_DETAILS_FOR_COMPARISON,
    GET_NUTRITION_COMPARISON,
];

const EXTRACTION_PROMPT: &str = "You extract the ingredients of the recipe mentioned by the user. \
Return a JSON object in the following format ONLY:\n\
{\"recipe\": \"<name_of_recipe>\", \"ingredients\": [\"ingredient1\", \"ingredient2\"]}";

/// Ingredient list produced by `extract_recipe_ingredients`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredients {
    /// Dish name
    pub recipe: String,
    /// Ingredient names
    pub ingredients: Vec<String>,
}

impl RecipeIngredients {
    fn unknown() -> Self {
        Self {
            recipe: "unknown".to_string(),
            ingredients: Vec::new(),
        }
    }
}

/// Compact product row offered as a choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Stock keeping unit
    pub sku: String,
    /// Display name
    pub item_name: String,
    /// Manufacturer
    pub brand: Option<String>,
    /// Unit price
    pub price: f64,
    /// Pack description, e.g. "1 500g"
    pub quantity: String,
    /// Category name
    pub category: Option<String>,
    /// Whether any units are left
    pub in_stock: bool,
}

impl From<Product> for ProductOption {
    fn from(product: Product) -> Self {
        Self {
            quantity: pack_size(&product),
            in_stock: product.stock_quantity > 0,
            sku: product.sku,
            item_name: product.item_name,
            brand: product.brand,
            price: product.price,
            category: product.category,
        }
    }
}

#[derive(Debug, Serialize)]
struct Availability {
    available: bool,
    options: Vec<ProductOption>,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProductDetails {
    sku: String,
    item_name: String,
    brand: Option<String>,
    price: f64,
    quantity: i64,
    unit: Option<String>,
    price_per_unit: String,
    category: Option<String>,
    nutritional_info: NutritionalInfo,
    allergens: Vec<String>,
    stock_quantity: i64,
    in_stock: bool,
}

#[derive(Debug, Serialize)]
struct NutritionalInfo {
    calories_per_100g: Option<i64>,
    protein_g: f64,
    fat_g: f64,
    carbs_g: f64,
    sugar_g: f64,
}

#[derive(Debug, Serialize)]
struct NutritionComparison {
    sku: String,
    name: String,
    nutrition_per_100g: NutritionPer100g,
    allergens: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NutritionPer100g {
    calories: i64,
    protein: String,
    fat: String,
    carbs: String,
    sugar: String,
}

#[derive(Deserialize)]
struct RecipeArgs {
    recipe_request: String,
}

#[derive(Deserialize)]
struct IngredientArgs {
    ingredient_name: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Deserialize)]
struct AlternativesArgs {
    ingredient_name: String,
    #[serde(default)]
    exclude_skus: Vec<String>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Deserialize)]
struct SkuArgs {
    skus: Vec<String>,
}

/// Executes assistant tool calls against the catalog
#[derive(Clone)]
pub struct CatalogTools {
    catalog: Arc<CatalogDb>,
}

impl CatalogTools {
    /// Tools backed by `catalog`
    pub fn new(catalog: Arc<CatalogDb>) -> Self {
        Self { catalog }
    }

    /// Definitions sent to the model with every completion request
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: EXTRACT_RECIPE_INGREDIENTS.into(),
                description: "Extract the required ingredients from a recipe request. \
                              Returns {\"recipe\", \"ingredients\"}."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "recipe_request": {
                            "type": "string",
                            "description": "The shopper's request, e.g. 'I want to make pizza'."
                        }
                    },
                    "required": ["recipe_request"]
                }),
            },
            ToolDefinition {
                name: CHECK_INGREDIENT_AVAILABILITY.into(),
                description: "Check whether one ingredient is sold and list the matching products. \
                              Call it for ONE ingredient at a time."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "ingredient_name": {
                            "type": "string",
                            "description": "Ingredient to look up, e.g. 'pasta'."
                        },
                        "category": {
                            "type": "string",
                            "description": "Optional exact category, e.g. 'grains'."
                        }
                    },
                    "required": ["ingredient_name"]
                }),
            },
            ToolDefinition {
                name: SEARCH_ALTERNATIVES.into(),
                description: "Find in-stock substitutes for an ingredient that is unavailable \
                              or that the shopper rejected."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "ingredient_name": {"type": "string"},
                        "exclude_skus": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "SKUs already offered."
                        },
                        "category": {
                            "type": "string",
                            "description": "Also accept anything from this category."
                        }
                    },
                    "required": ["ingredient_name"]
                }),
            },
            ToolDefinition {
                name: GET_PRODUCT_DETAILS_FOR_COMPARISON.into(),
                description: "Fetch price, pack size, nutrition and stock for several products, \
                              cheapest first."
                    .into(),
                parameters: sku_list_schema(),
            },
            ToolDefinition {
                name: GET_NUTRITION_COMPARISON.into(),
                description: "Compare nutrition per 100 g and allergens for several products."
                    .into(),
                parameters: sku_list_schema(),
            },
        ]
    }

    /// Run one tool call and return its JSON result
    pub async fn execute(&self, client: &dyn CompletionClient, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        let arguments = call.function.arguments.as_str();
        debug!(tool = name, call_id = %call.id, "Running assistant tool");

        match name {
            EXTRACT_RECIPE_INGREDIENTS => match parse_args::<RecipeArgs>(name, arguments) {
                Ok(args) => to_json(&extract_ingredients(client, &args.recipe_request).await),
                Err(error) => to_json(&error),
            },
            CHECK_INGREDIENT_AVAILABILITY => match parse_args::<IngredientArgs>(name, arguments) {
                Ok(args) => to_json(
                    &self
                        .check_availability(&args.ingredient_name, args.category.as_deref())
                        .await,
                ),
                Err(error) => to_json(&error),
            },
            SEARCH_ALTERNATIVES => match parse_args::<AlternativesArgs>(name, arguments) {
                Ok(args) => to_json(&self.search_alternatives(&args).await),
                Err(error) => to_json(&error),
            },
            GET_PRODUCT_DETAILS_FOR_COMPARISON => match parse_args::<SkuArgs>(name, arguments) {
                Ok(args) => to_json(&self.product_details(&args.skus).await),
                Err(error) => to_json(&error),
            },
            GET_NUTRITION_COMPARISON => match parse_args::<SkuArgs>(name, arguments) {
                Ok(args) => to_json(&self.nutrition_comparison(&args.skus).await),
                Err(error) => to_json(&error),
            },
            unknown => {
                warn!(tool = unknown, "Model requested an unknown tool");
                to_json(&json!({
                    "error": format!(
                        "Unknown tool: '{}'. Available tools: {}.",
                        unknown,
                        TOOL_NAMES.join(", ")
                    )
                }))
            }
        }
    }

    async fn check_availability(&self, ingredient: &str, category: Option<&str>) -> Availability {
        match self.catalog.find_by_name(ingredient, category).await {
            Ok(products) => {
                let options: Vec<ProductOption> =
                    products.into_iter().map(ProductOption::from).collect();
                Availability {
                    available: !options.is_empty(),
                    count: options.len(),
                    options,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, ingredient, "Availability lookup failed");
                Availability {
                    available: false,
                    options: Vec::new(),
                    count: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn search_alternatives(&self, args: &AlternativesArgs) -> Vec<ProductOption> {
        self.catalog
            .find_alternatives(
                &args.ingredient_name,
                &args.exclude_skus,
                args.category.as_deref(),
                ALTERNATIVES_LIMIT,
            )
            .await
            .map(|products| products.into_iter().map(ProductOption::from).collect())
            .unwrap_or_else(|e| {
                warn!(error = %e, "Alternatives lookup failed");
                Vec::new()
            })
    }

    async fn product_details(&self, skus: &[String]) -> Vec<ProductDetails> {
        self.lookup_skus(skus)
            .await
            .into_iter()
            .map(|product| ProductDetails {
                price_per_unit: format!("${:.2}/{}", product.price, pack_size(&product)),
                nutritional_info: NutritionalInfo {
                    calories_per_100g: product.calories_per_100g,
                    protein_g: product.protein_g.unwrap_or_default(),
                    fat_g: product.fat_g.unwrap_or_default(),
                    carbs_g: product.carbs_g.unwrap_or_default(),
                    sugar_g: product.sugar_g.unwrap_or_default(),
                },
                allergens: allergen_list(product.allergens.as_deref()),
                in_stock: product.stock_quantity > 0,
                stock_quantity: product.stock_quantity,
                sku: product.sku,
                item_name: product.item_name,
                brand: product.brand,
                price: product.price,
                quantity: product.quantity,
                unit: product.unit,
                category: product.category,
            })
            .collect()
    }

    async fn nutrition_comparison(&self, skus: &[String]) -> Vec<NutritionComparison> {
        self.lookup_skus(skus)
            .await
            .into_iter()
            .map(|product| {
                let mut allergens = allergen_list(product.allergens.as_deref());
                if allergens.is_empty() {
                    allergens.push("None".to_string());
                }
                NutritionComparison {
                    name: match &product.brand {
                        Some(brand) => format!("{} {}", brand, product.item_name),
                        None => product.item_name.clone(),
                    },
                    nutrition_per_100g: NutritionPer100g {
                        calories: product.calories_per_100g.unwrap_or_default(),
                        protein: grams(product.protein_g),
                        fat: grams(product.fat_g),
                        carbs: grams(product.carbs_g),
                        sugar: grams(product.sugar_g),
                    },
                    allergens,
                    sku: product.sku,
                }
            })
            .collect()
    }

    async fn lookup_skus(&self, skus: &[String]) -> Vec<Product> {
        self.catalog.products_by_skus(skus).await.unwrap_or_else(|e| {
            warn!(error = %e, "SKU lookup failed");
            Vec::new()
        })
    }
}

/// Ask the model for a recipe's ingredient list
///
/// Anything that is not the expected JSON object yields an `unknown` recipe.
pub async fn extract_ingredients(client: &dyn CompletionClient, request: &str) -> RecipeIngredients {
    let messages = [
        ChatTurn::new(TurnRole::System, EXTRACTION_PROMPT),
        ChatTurn::new(TurnRole::User, request),
    ];
    match client.complete(&messages).await {
        Ok(text) => parse_recipe(&text).unwrap_or_else(|| {
            warn!(response_len = text.len(), "Ingredient extraction returned no JSON object");
            RecipeIngredients::unknown()
        }),
        Err(e) => {
            warn!(error = %e, "Ingredient extraction failed");
            RecipeIngredients::unknown()
        }
    }
}

// Models often wrap the object in a code fence or a sentence.
fn parse_recipe(text: &str) -> Option<RecipeIngredients> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T, Value> {
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments).map_err(|e| {
        warn!(tool, error = %e, "Rejected tool arguments");
        json!({ "error": format!("Invalid arguments for {}: {}", tool, e) })
    })
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Serialization error: {}\"}}", e))
}

fn sku_list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "skus": {
                "type": "array",
                "items": {"type": "string"},
                "description": "SKUs returned by earlier lookups."
            }
        },
        "required": ["skus"]
    })
}

fn pack_size(product: &Product) -> String {
    match &product.unit {
        Some(unit) => format!("{} {}", product.quantity, unit),
        None => product.quantity.to_string(),
    }
}

fn allergen_list(allergens: Option<&str>) -> Vec<String> {
    allergens
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn grams(value: Option<f64>) -> String {
    format!("{}g", value.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedClient {
        reply: Result<String, String>,
        prompts: Mutex<Vec<Vec<ChatTurn>>>,
    }

    impl FixedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("HTTP 503".to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(&self, messages: &[ChatTurn]) -> Result<String, AppError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map_err(AppError::Completion)
        }
    }

    async fn tools() -> (CatalogTools, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let catalog = CatalogDb::new(db_path.to_str().unwrap()).await.unwrap();
        (CatalogTools::new(Arc::new(catalog)), dir)
    }

    async fn run(tools: &CatalogTools, name: &str, arguments: Value) -> Value {
        let call = ToolCall::function("call_1", name, arguments.to_string());
        let output = tools.execute(&FixedClient::failing(), &call).await;
        serde_json::from_str(&output).unwrap()
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let definitions = CatalogTools::definitions();
        let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, TOOL_NAMES.to_vec());
        assert!(definitions
            .iter()
            .all(|d| d.parameters["type"] == "object"));
    }

    #[tokio::test]
    async fn test_check_availability_lists_options() {
        let (tools, _dir) = tools().await;

        let found = run(
            &tools,
            CHECK_INGREDIENT_AVAILABILITY,
            json!({"ingredient_name": "pasta"}),
        )
        .await;
        assert_eq!(found["available"], true);
        assert_eq!(found["count"], 3);
        assert_eq!(found["options"][0]["sku"], "PANTRY-PASTA-500G-RONZONI");
        assert_eq!(found["options"][0]["quantity"], "1 500g");
        assert!(found.get("error").is_none());

        let missing = run(
            &tools,
            CHECK_INGREDIENT_AVAILABILITY,
            json!({"ingredient_name": "pasta", "category": "dairy"}),
        )
        .await;
        assert_eq!(missing["available"], false);
        assert_eq!(missing["count"], 0);
        assert_eq!(missing["options"], json!([]));
    }

    #[tokio::test]
    async fn test_search_alternatives_excludes_offered() {
        let (tools, _dir) = tools().await;

        let alternatives = run(
            &tools,
            SEARCH_ALTERNATIVES,
            json!({
                "ingredient_name": "pasta",
                "exclude_skus": ["PANTRY-PASTA-500G-RONZONI", "PANTRY-PASTA-500G-BARILLA"]
            }),
        )
        .await;
        assert_eq!(alternatives.as_array().unwrap().len(), 1);
        assert_eq!(alternatives[0]["sku"], "PANTRY-PASTA-500G-OLVERDE");
        assert_eq!(alternatives[0]["in_stock"], true);
    }

    #[tokio::test]
    async fn test_product_details_sorted_by_price() {
        let (tools, _dir) = tools().await;

        let details = run(
            &tools,
            GET_PRODUCT_DETAILS_FOR_COMPARISON,
            json!({"skus": ["PANTRY-PASTA-500G-BARILLA", "PANTRY-PASTA-500G-RONZONI"]}),
        )
        .await;
        assert_eq!(details[0]["sku"], "PANTRY-PASTA-500G-RONZONI");
        assert_eq!(details[1]["price_per_unit"], "$2.99/1 500g");
        assert_eq!(details[1]["allergens"], json!(["Contains: Gluten"]));
        assert_eq!(details[1]["nutritional_info"]["protein_g"], 60.0);
    }

    #[tokio::test]
    async fn test_nutrition_comparison() {
        let (tools, _dir) = tools().await;

        let comparison = run(
            &tools,
            GET_NUTRITION_COMPARISON,
            json!({"skus": ["DOUGH-YEAST-10G-REDSTAR"]}),
        )
        .await;
        assert_eq!(comparison[0]["name"], "Red Star Active dry yeast");
        assert_eq!(comparison[0]["nutrition_per_100g"]["calories"], 32);
        assert_eq!(comparison[0]["nutrition_per_100g"]["protein"], "4g");
        assert_eq!(comparison[0]["allergens"], json!(["None"]));
    }

    #[tokio::test]
    async fn test_bad_arguments_and_unknown_tool() {
        let (tools, _dir) = tools().await;

        let invalid = run(&tools, SEARCH_ALTERNATIVES, json!({"name": "pasta"})).await;
        assert!(invalid["error"]
            .as_str()
            .unwrap()
            .contains("Invalid arguments for search_alternatives"));

        let unknown = run(&tools, "add_to_cart", json!({})).await;
        assert!(unknown["error"].as_str().unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_extract_ingredients_tolerates_fences() {
        let client = FixedClient::replying(
            "```json\n{\"recipe\": \"pizza\", \"ingredients\": [\"flour\", \"yeast\"]}\n```",
        );
        let recipe = extract_ingredients(&client, "I want to make pizza").await;
        assert_eq!(recipe.recipe, "pizza");
        assert_eq!(recipe.ingredients, vec!["flour", "yeast"]);

        let prompt = &client.prompts.lock().unwrap()[0];
        assert_eq!(prompt[0].role, TurnRole::System);
        assert_eq!(prompt[1].content, "I want to make pizza");
    }

    #[tokio::test]
    async fn test_extract_ingredients_falls_back_to_unknown() {
        let recipe = extract_ingredients(&FixedClient::replying("pizza needs flour"), "pizza").await;
        assert_eq!(recipe, RecipeIngredients::unknown());

        let recipe = extract_ingredients(&FixedClient::failing(), "pizza").await;
        assert_eq!(recipe, RecipeIngredients::unknown());
    }
}
