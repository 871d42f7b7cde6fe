use anyhow::{bail, Context, Result};
use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::step::Step;

static RECIPE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/recipes");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A generated (or demo) recipe with its cooking timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Planned cooking time in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    pub timeline: Vec<Step>,
}

impl Recipe {
    /// Planned session length: `cookTime` minutes when given, otherwise the
    /// furthest offset mentioned by any step.
    pub fn total_seconds(&self) -> u64 {
        if let Some(minutes) = self.cook_time {
            return u64::from(minutes) * 60;
        }
        self.timeline
            .iter()
            .map(|step| step.end_offset.unwrap_or(step.start_offset))
            .max()
            .unwrap_or(0)
    }

    /// Load an embedded demo recipe by name (file stem under `src/recipes`)
    pub fn demo(name: &str) -> Result<Self> {
        let file = RECIPE_DIR
            .get_file(format!("{name}.json"))
            .with_context(|| format!("no demo recipe named {name:?}"))?;
        let contents = file
            .contents_utf8()
            .with_context(|| format!("demo recipe {name:?} is not valid UTF-8"))?;
        let mut recipes = parse_recipes(contents)
            .with_context(|| format!("unable to deserialize demo recipe {name:?}"))?;
        Ok(recipes.remove(0))
    }

    pub fn demo_names() -> Vec<String> {
        let mut names: Vec<String> = RECIPE_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|f| f.path().file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// The generator's `{"recipes": [...]}` envelope, possibly carrying an error
#[derive(Debug, Deserialize)]
struct RecipeBook {
    #[serde(default)]
    recipes: Vec<Recipe>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse `{"recipes": [...]}`, a bare list, or a single recipe.
/// An empty result or a generator-reported error is an error.
pub fn parse_recipes(json: &str) -> Result<Vec<Recipe>> {
    let value: serde_json::Value = serde_json::from_str(json).context("invalid recipe JSON")?;
    let recipes = match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value::<Vec<Recipe>>(value).context("invalid recipe list")?
        }
        serde_json::Value::Object(_) if value.get("timeline").is_some() => {
            vec![serde_json::from_value::<Recipe>(value).context("invalid recipe")?]
        }
        serde_json::Value::Object(_) => {
            let book: RecipeBook =
                serde_json::from_value(value).context("invalid recipe book")?;
            if let Some(error) = book.error {
                bail!("recipe generator reported an error: {error}");
            }
            book.recipes
        }
        _ => bail!("expected a recipe, a list of recipes or {{\"recipes\": [...]}}"),
    };
    if recipes.is_empty() {
        bail!("payload contains no recipes");
    }
    Ok(recipes)
}

pub fn load_recipes<P: AsRef<Path>>(path: P) -> Result<Vec<Recipe>> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_recipes(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Pick one recipe (0-based) out of a payload
pub fn pick(mut recipes: Vec<Recipe>, index: usize) -> Result<Recipe> {
    if index >= recipes.len() {
        bail!(
            "recipe index {index} out of range ({} available)",
            recipes.len()
        );
    }
    Ok(recipes.swap_remove(index))
}

/// Ephemeral cache of the last selected recipe payload.
/// Lives in the platform cache dir, so clearing caches forgets it.
#[derive(Debug, Clone)]
pub struct SelectionCache {
    path: PathBuf,
}

impl SelectionCache {
    pub fn new() -> Option<Self> {
        crate::app_dirs::AppDirs::selection_cache_path().map(|path| Self { path })
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn store(&self, recipe: &Recipe) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec(recipe)?;
        fs::write(&self.path, data).with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn load(&self) -> Option<Recipe> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice::<Recipe>(&bytes) {
            Ok(recipe) => Some(recipe),
            Err(err) => {
                log::warn!("ignoring unreadable selection cache: {err}");
                None
            }
        }
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}
