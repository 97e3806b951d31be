//! The in-memory drinks menu

use std::{collections::BTreeMap, sync::Arc};

use barista::jwt::OneOrMany;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// One component of a recipe
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// What goes in
    pub name: String,
    /// How it is drawn on the menu
    pub color: String,
    /// How much of the drink it makes up
    pub parts: u32,
}

/// The ingredients of a drink
///
/// Accepts a single ingredient object as well as a list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany<Ingredient>")]
pub struct Recipe(pub Vec<Ingredient>);

impl From<OneOrMany<Ingredient>> for Recipe {
    fn from(vals: OneOrMany<Ingredient>) -> Self {
        match vals {
            OneOrMany::One(x) => Self(vec![x]),
            OneOrMany::Many(v) => Self(v),
        }
    }
}

impl FromIterator<Ingredient> for Recipe {
    fn from_iter<I: IntoIterator<Item = Ingredient>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A drink on the menu
///
/// Serializes in its long form, with ingredient names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Drink {
    /// Identifier assigned by the store
    pub id: u64,
    /// Unique title
    pub title: String,
    /// Ingredients
    pub recipe: Recipe,
}

/// The public form of a drink, without ingredient names
#[derive(Debug, Serialize)]
pub struct ShortDrink<'a> {
    id: u64,
    title: &'a str,
    recipe: Vec<ShortIngredient<'a>>,
}

#[derive(Debug, Serialize)]
struct ShortIngredient<'a> {
    color: &'a str,
    parts: u32,
}

impl Drink {
    /// The public form of this drink
    pub fn short(&self) -> ShortDrink<'_> {
        ShortDrink {
            id: self.id,
            title: &self.title,
            recipe: self
                .recipe
                .0
                .iter()
                .map(|i| ShortIngredient {
                    color: &i.color,
                    parts: i.parts,
                })
                .collect(),
        }
    }
}

/// A drink to be added to the menu
#[derive(Clone, Debug, Deserialize)]
pub struct NewDrink {
    /// Title, unique across the menu
    pub title: String,
    /// Ingredients
    pub recipe: Recipe,
}

/// Changes to an existing drink
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DrinkPatch {
    /// Replacement title
    #[serde(default)]
    pub title: Option<String>,
    /// Replacement recipe
    #[serde(default)]
    pub recipe: Option<Recipe>,
}

impl DrinkPatch {
    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.recipe.is_none()
    }
}

/// Why a menu change was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No drink has the id
    #[error("no drink with id {0}")]
    NotFound(u64),

    /// Another drink already uses the title
    #[error("a drink titled `{0}` already exists")]
    DuplicateTitle(String),

    /// The title is blank
    #[error("drink title cannot be blank")]
    BlankTitle,

    /// The patch names no field
    #[error("nothing to update")]
    EmptyPatch,
}

#[derive(Debug, Default)]
struct Menu {
    last_id: u64,
    drinks: BTreeMap<u64, Drink>,
}

impl Menu {
    fn check_title(&self, title: &str, except: Option<u64>) -> Result<(), StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::BlankTitle);
        }
        let taken = self
            .drinks
            .values()
            .any(|d| d.title == title && Some(d.id) != except);
        if taken {
            return Err(StoreError::DuplicateTitle(title.to_owned()));
        }
        Ok(())
    }
}

/// Shared handle to the drinks menu
///
/// Ids are assigned sequentially from 1 and never reused.
#[derive(Clone, Debug, Default)]
pub struct DrinkStore {
    menu: Arc<RwLock<Menu>>,
}

impl DrinkStore {
    /// An empty menu
    pub fn new() -> Self {
        Self::default()
    }

    /// All drinks, ordered by id
    pub async fn list(&self) -> Vec<Drink> {
        self.menu.read().await.drinks.values().cloned().collect()
    }

    /// The drink with `id`
    pub async fn get(&self, id: u64) -> Option<Drink> {
        self.menu.read().await.drinks.get(&id).cloned()
    }

    /// Adds a drink to the menu
    pub async fn insert(&self, drink: NewDrink) -> Result<Drink, StoreError> {
        let mut menu = self.menu.write().await;
        menu.check_title(&drink.title, None)?;

        menu.last_id += 1;
        let drink = Drink {
            id: menu.last_id,
            title: drink.title,
            recipe: drink.recipe,
        };
        menu.drinks.insert(drink.id, drink.clone());
        tracing::debug!(drink.id = drink.id, "drink added");
        Ok(drink)
    }

    /// Applies `patch` to the drink with `id`
    pub async fn update(&self, id: u64, patch: DrinkPatch) -> Result<Drink, StoreError> {
        let mut menu = self.menu.write().await;
        if !menu.drinks.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if patch.is_empty() {
            return Err(StoreError::EmptyPatch);
        }
        if let Some(title) = &patch.title {
            menu.check_title(title, Some(id))?;
        }

        let drink = menu
            .drinks
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(title) = patch.title {
            drink.title = title;
        }
        if let Some(recipe) = patch.recipe {
            drink.recipe = recipe;
        }
        tracing::debug!(drink.id = id, "drink updated");
        Ok(drink.clone())
    }

    /// Removes the drink with `id`
    pub async fn remove(&self, id: u64) -> Result<Drink, StoreError> {
        let removed = self
            .menu
            .write()
            .await
            .drinks
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;
        tracing::debug!(drink.id = id, "drink removed");
        Ok(removed)
    }
}
