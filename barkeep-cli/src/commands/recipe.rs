//! Recipe commands - add, list, show, remove, import, load defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use barkeep_core::{CoreError, IngredientKind, Recipe, RecipeIngredient};
use barkeep_costing::{default_recipes, ingredient_from_text};
use clap::{Args, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};

use super::{print_json, Session};
use crate::output::TextFormatter;
use crate::Cli;

/// Arguments for the recipe command.
#[derive(Args)]
pub struct RecipeArgs {
    #[command(subcommand)]
    pub action: RecipeAction,
}

/// Recipe subcommands.
#[derive(Subcommand)]
pub enum RecipeAction {
    /// Add or replace a recipe.
    Add {
        /// Recipe name.
        name: String,

        /// Ingredient line such as "60ml Vodka" (repeatable, in order).
        #[arg(long = "ingredient", short = 'i', required = true)]
        ingredients: Vec<String>,

        /// Recipe category.
        #[arg(long, short)]
        category: Option<String>,

        /// Serving size in ml.
        #[arg(long)]
        serving_size: Option<f64>,
    },

    /// List recipes.
    List,

    /// Show one recipe.
    Show {
        /// Recipe name.
        name: String,
    },

    /// Remove a recipe.
    Remove {
        /// Recipe name.
        name: String,
    },

    /// Import recipes from a YAML file.
    Import {
        /// YAML file with a list of recipes.
        file: PathBuf,
    },

    /// Load the built-in classic cocktails.
    LoadDefaults {
        /// Overwrite recipes that already exist.
        #[arg(long)]
        replace: bool,
    },
}

/// Runs the recipe command.
pub async fn run(args: &RecipeArgs, cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let formatter = TextFormatter::new(!cli.no_color);

    match &args.action {
        RecipeAction::Add {
            name,
            ingredients,
            category,
            serving_size,
        } => {
            let recipe = build_recipe(name, ingredients, category.as_deref(), *serving_size)?;
            session.repo.save_recipe(&recipe)?;
            info!(recipe = %recipe.name, "Saved recipe");
            if !print_json(cli, &recipe)? {
                println!("{}", formatter.format_recipe(&recipe));
            }
        }
        RecipeAction::List => {
            let recipes = session.repo.list_recipes()?;
            if !print_json(cli, &recipes)? {
                println!("{}", formatter.format_recipe_list(&recipes));
            }
        }
        RecipeAction::Show { name } => {
            let recipe = session
                .repo
                .get_recipe(name)?
                .ok_or_else(|| CoreError::NotFound(format!("recipe '{name}'")))?;
            if !print_json(cli, &recipe)? {
                println!("{}", formatter.format_recipe(&recipe));
            }
        }
        RecipeAction::Remove { name } => {
            if !session.repo.delete_recipe(name)? {
                return Err(CoreError::NotFound(format!("recipe '{name}'")).into());
            }
            if !cli.quiet {
                println!("Removed recipe '{name}'");
            }
        }
        RecipeAction::Import { file } => {
            let text = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let recipes = parse_recipe_yaml(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            for recipe in &recipes {
                session.repo.save_recipe(recipe)?;
            }
            info!(count = recipes.len(), "Imported recipes");
            if !print_json(cli, &recipes)? && !cli.quiet {
                println!("Imported {} recipe(s)", recipes.len());
            }
        }
        RecipeAction::LoadDefaults { replace } => {
            let mut loaded = 0;
            for recipe in default_recipes() {
                if !replace && session.repo.get_recipe(&recipe.name)?.is_some() {
                    continue;
                }
                session.repo.save_recipe(&recipe)?;
                loaded += 1;
            }
            let recipes = session.repo.list_recipes()?;
            if !print_json(cli, &recipes)? {
                if !cli.quiet {
                    println!("Loaded {loaded} recipe(s)");
                    println!();
                }
                println!("{}", formatter.format_recipe_list(&recipes));
            }
        }
    }

    Ok(())
}

/// Builds a recipe from ingredient lines.
pub fn build_recipe(
    name: &str,
    lines: &[String],
    category: Option<&str>,
    serving_size: Option<f64>,
) -> Result<Recipe> {
    let mut recipe = Recipe::new(name.trim());
    if let Some(category) = category {
        recipe = recipe.with_category(category);
    }
    if let Some(size) = serving_size {
        recipe = recipe.with_serving_size(size);
    }
    for line in lines {
        let ingredient =
            ingredient_from_text(line).with_context(|| format!("ingredient '{line}'"))?;
        recipe = recipe.with_ingredient(ingredient);
    }
    recipe.validate()?;
    Ok(recipe)
}

// ============================================================================
// YAML Import
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeFile {
    List(Vec<RecipeEntry>),
    Wrapped { recipes: Vec<RecipeEntry> },
}

#[derive(Debug, Deserialize)]
struct RecipeEntry {
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    serving_size_ml: Option<f64>,
    ingredients: Vec<IngredientEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IngredientEntry {
    Text(String),
    Detailed {
        text: String,
        #[serde(default)]
        kind: Option<IngredientKind>,
        #[serde(default)]
        alcohol_type: Option<String>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        min_abv: Option<f64>,
        #[serde(default)]
        brand: Option<String>,
    },
}

impl IngredientEntry {
    fn into_ingredient(self) -> Result<RecipeIngredient> {
        match self {
            Self::Text(text) => {
                Ok(ingredient_from_text(&text).with_context(|| format!("ingredient '{text}'"))?)
            }
            Self::Detailed {
                text,
                kind,
                alcohol_type,
                category,
                min_abv,
                brand,
            } => {
                let mut ingredient =
                    ingredient_from_text(&text).with_context(|| format!("ingredient '{text}'"))?;
                if let Some(kind) = kind {
                    ingredient.kind = kind;
                }
                if let Some(alcohol_type) = alcohol_type {
                    ingredient = ingredient.with_alcohol_type(alcohol_type);
                }
                if let Some(category) = category {
                    ingredient = ingredient.with_category(category);
                }
                if let Some(min_abv) = min_abv {
                    ingredient = ingredient.with_min_abv(min_abv);
                }
                if let Some(brand) = brand {
                    ingredient = ingredient.with_brand(brand);
                }
                Ok(ingredient)
            }
        }
    }
}

/// Parses a YAML recipe file: a list of recipes, or a map with a `recipes` list.
///
/// Ingredients are either lines like `"60ml Vodka"` or maps with a `text`
/// line plus optional `kind`, `alcohol_type`, `category`, `min_abv` and
/// `brand` overrides.
pub fn parse_recipe_yaml(text: &str) -> Result<Vec<Recipe>> {
    let entries = match serde_yaml::from_str::<RecipeFile>(text)? {
        RecipeFile::List(entries) | RecipeFile::Wrapped { recipes: entries } => entries,
    };
    if entries.is_empty() {
        warn!("Recipe file contains no recipes");
    }

    entries
        .into_iter()
        .map(|entry| {
            let mut recipe = Recipe::new(entry.name.trim());
            recipe.category = entry.category;
            if let Some(size) = entry.serving_size_ml {
                recipe.serving_size_ml = size;
            }
            for ingredient in entry.ingredients {
                recipe.ingredients.push(ingredient.into_ingredient()?);
            }
            recipe
                .validate()
                .with_context(|| format!("recipe '{}'", recipe.name))?;
            Ok(recipe)
        })
        .collect()
}
