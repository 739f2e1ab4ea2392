//! Alcohol-type aliases and ingredient classification.
//!
//! Recipes say "bourbon" or "triple sec"; the retailer files products under
//! `Spirits|Whisky|Bourbon` or `Spirits|Liqueur`. The alias table bridges
//! the two vocabularies.

use barkeep_core::IngredientKind;

// ============================================================================
// Normalization
// ============================================================================

/// Words that carry no matching signal.
pub const STOPWORDS: &[&str] = &["the", "and", "with", "for", "fresh", "premium"];

/// Lowercases, maps punctuation to spaces, and collapses whitespace.
///
/// Apostrophes are dropped so `Hendrick's` and `Hendricks` agree.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .filter(|c| *c != '\'' && *c != '’')
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the distinct matching tokens of `text`: normalized words of at
/// least three characters that are not stopwords.
pub fn tokens(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in normalize(text).split(' ') {
        if word.chars().count() >= 3 && !STOPWORDS.contains(&word) && !out.iter().any(|w| w == word)
        {
            out.push(word.to_string());
        }
    }
    out
}

/// Returns true if `phrase` occurs in `text` on word boundaries.
///
/// Both arguments must already be normalized.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    !phrase.is_empty() && format!(" {text} ").contains(&format!(" {phrase} "))
}

// ============================================================================
// Alcohol Aliases
// ============================================================================

/// One alcohol type and how the retailer names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlcoholAlias {
    /// Canonical type name, used as the alcohol-type hint.
    pub key: &'static str,
    /// Words in recipe text that mean this type.
    pub names: &'static [&'static str],
    /// Retailer top-level category.
    pub category: &'static str,
    /// Words that identify the type in a product's category path.
    pub terms: &'static [&'static str],
}

/// Known alcohol types.
pub const ALCOHOL_ALIASES: &[AlcoholAlias] = &[
    AlcoholAlias {
        key: "vodka",
        names: &["vodka"],
        category: "Spirits",
        terms: &["vodka"],
    },
    AlcoholAlias {
        key: "gin",
        names: &["gin", "london dry", "plymouth"],
        category: "Spirits",
        terms: &["gin"],
    },
    AlcoholAlias {
        key: "rum",
        names: &["rum", "rhum", "cachaca"],
        category: "Spirits",
        terms: &["rum", "cachaca"],
    },
    AlcoholAlias {
        key: "whisky",
        names: &["whiskey", "whisky", "bourbon", "rye", "scotch"],
        category: "Spirits",
        terms: &["whisky", "whiskey", "bourbon", "rye", "scotch"],
    },
    AlcoholAlias {
        key: "tequila",
        names: &["tequila", "mezcal"],
        category: "Spirits",
        terms: &["tequila", "mezcal"],
    },
    AlcoholAlias {
        key: "brandy",
        names: &["brandy", "cognac", "pisco", "calvados"],
        category: "Spirits",
        terms: &["brandy", "cognac", "pisco", "calvados"],
    },
    AlcoholAlias {
        key: "liqueur",
        names: &[
            "liqueur",
            "triple sec",
            "amaretto",
            "kahlua",
            "baileys",
            "cointreau",
            "grand marnier",
            "campari",
            "aperol",
            "chartreuse",
            "maraschino",
            "irish cream",
            "coffee liqueur",
        ],
        category: "Spirits",
        terms: &["liqueur", "liqueurs", "aperitif", "amaro"],
    },
    AlcoholAlias {
        key: "vermouth",
        names: &["vermouth", "lillet"],
        category: "Wine",
        terms: &["vermouth", "fortified"],
    },
    AlcoholAlias {
        key: "sparkling wine",
        names: &["champagne", "prosecco", "sparkling wine", "cava"],
        category: "Wine",
        terms: &["sparkling", "champagne", "prosecco"],
    },
    AlcoholAlias {
        key: "wine",
        names: &["wine"],
        category: "Wine",
        terms: &["wine"],
    },
    AlcoholAlias {
        key: "beer",
        names: &["beer", "lager", "ale", "stout"],
        category: "Beer & Cider",
        terms: &["beer", "lager", "ale", "stout"],
    },
];

/// Finds the alias named in `text`.
///
/// The longest matching name wins, so "sparkling wine" beats "wine".
pub fn find_alias(text: &str) -> Option<&'static AlcoholAlias> {
    let text = normalize(text);
    ALCOHOL_ALIASES
        .iter()
        .flat_map(|alias| alias.names.iter().map(move |name| (alias, *name)))
        .filter(|(_, name)| contains_phrase(&text, name))
        .max_by_key(|(_, name)| name.len())
        .map(|(alias, _)| alias)
}

impl AlcoholAlias {
    /// Returns true if a product's category path identifies this type.
    pub fn matches_category_path(&self, category: Option<&str>, subcategory: Option<&str>) -> bool {
        [subcategory, category].into_iter().flatten().any(|part| {
            let part = normalize(part);
            self.terms.iter().any(|term| contains_phrase(&part, term))
        })
    }

    /// Returns every word this alias uses, for candidate search and
    /// keyword bookkeeping.
    pub fn words(&self) -> impl Iterator<Item = &'static str> {
        self.names
            .iter()
            .chain(self.terms.iter())
            .flat_map(|phrase| phrase.split(' '))
    }
}

// ============================================================================
// Ingredient Kind
// ============================================================================

const MIXER_WORDS: &[&str] = &[
    "juice", "syrup", "bitters", "soda", "tonic", "water", "cola", "ginger beer", "ginger ale",
    "grenadine", "cream", "milk", "egg", "sugar", "salt", "honey", "agave", "puree", "coffee",
    "espresso", "lemonade",
];

const GARNISH_WORDS: &[&str] = &[
    "garnish", "peel", "twist", "wheel", "wedge", "wedges", "slice", "sprig", "cherry", "olive",
    "mint", "leaves",
];

/// Infers an ingredient's role from its name.
///
/// Alcohol names win over mixer words, so "coffee liqueur" is alcohol and
/// "ginger beer" is a mixer.
pub fn classify_kind(name: &str) -> IngredientKind {
    let text = normalize(name);
    let mixer = MIXER_WORDS.iter().any(|w| contains_phrase(&text, w));
    let garnish = GARNISH_WORDS.iter().any(|w| contains_phrase(&text, w));

    match find_alias(&text) {
        // "ginger beer", "cream soda": the mixer phrase is longer than the alias
        Some(alias) if mixer && alias.key == "beer" => IngredientKind::Mixer,
        Some(_) => IngredientKind::Alcohol,
        None if mixer => IngredientKind::Mixer,
        None if garnish => IngredientKind::Garnish,
        None => IngredientKind::Alcohol,
    }
}

/// Infers the retailer category for an ingredient.
///
/// An explicit category hint wins; otherwise the alias of the alcohol-type
/// hint, then the alias named in `name`.
pub fn infer_category(
    category_hint: Option<&str>,
    alcohol_type_hint: Option<&str>,
    name: &str,
) -> Option<String> {
    if let Some(category) = category_hint.filter(|c| !c.trim().is_empty()) {
        return Some(category.trim().to_string());
    }
    alcohol_type_hint
        .and_then(find_alias)
        .or_else(|| find_alias(name))
        .map(|alias| alias.category.to_string())
}
