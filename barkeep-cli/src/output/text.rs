//! Text output formatting with tables and colors.

use barkeep_core::{
    CatalogRecord, CatalogStats, CostCalculation, PriceHistoryEntry, Recipe, Resolution,
};
use barkeep_fetch::{DescriptorSource, EndpointDescriptor};
use barkeep_store::IngestReport;

use crate::commands::init::InitOutput;
use crate::commands::verify::IngredientReport;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

const NAME_WIDTH: usize = 40;
const RULE_WIDTH: usize = 50;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Setup & Crawling
    // ========================================================================

    /// Formats the init summary.
    pub fn format_init(&self, init: &InitOutput<'_>) -> String {
        let settings = init.settings;
        let mut lines = vec![
            format!("{} Database ready", self.green("✓")),
            "─".repeat(RULE_WIDTH),
            format!("Database:         {}", init.database),
            format!(
                "Endpoint cache:   {} {}",
                init.descriptor_cache,
                if init.descriptor_cached {
                    self.green("(cached)")
                } else {
                    self.dim("(run `barkeep discover`)")
                }
            ),
            format!("Target page:      {}", settings.target_url),
            format!(
                "Request delay:    {:.1}-{:.1} s",
                settings.min_request_delay, settings.max_request_delay
            ),
            format!(
                "Quiet hours:      {:02}:00-{:02}:00",
                settings.avoid_hours_start, settings.avoid_hours_end
            ),
            format!("Max retries:      {}", settings.max_retries),
            format!("Markup:           {}x", settings.markup_multiplier),
        ];
        if !settings.rotate_user_agents {
            lines.push(self.dim("User-agent rotation disabled"));
        }
        lines.join("\n")
    }

    /// Formats a discovered or cached endpoint descriptor.
    pub fn format_descriptor(
        &self,
        descriptor: &EndpointDescriptor,
        source: DescriptorSource,
    ) -> String {
        let source = match source {
            DescriptorSource::Discovered => self.green("discovered"),
            DescriptorSource::Cached => self.yellow("cached"),
        };
        let grammar = &descriptor.grammar;
        let mut lines = vec![
            format!("{} ({source})", self.bold("Search endpoint")),
            "─".repeat(RULE_WIDTH),
            format!("URL:         {}", self.cyan(&descriptor.base_url)),
            format!("Method:      {:?}", grammar.encoding),
            format!("Pagination:  {:?} via {}", descriptor.pagination, grammar.offset_param),
            format!("Page size:   {}", grammar.page_size_param),
            format!("Query:       {}", grammar.query_param),
        ];
        if let Some(param) = &grammar.category_param {
            lines.push(format!("Category:    {param} = {}", grammar.category_template));
        }
        if !descriptor.required_headers.is_empty() {
            let names: Vec<&str> = descriptor.required_headers.keys().map(String::as_str).collect();
            lines.push(format!("Headers:     {}", names.join(", ")));
        }
        lines.push(format!("Source page: {}", descriptor.source_page));
        lines.push(format!(
            "Discovered:  {}",
            descriptor.discovered_at.format("%Y-%m-%d %H:%M UTC")
        ));
        lines.join("\n")
    }

    /// Formats the outcome of crawling one category.
    pub fn format_crawl_report(&self, report: &IngestReport) -> String {
        let status = match &report.stopped {
            None => self.green("✓"),
            Some(_) => self.red("✗"),
        };
        let mut line = format!(
            "{status} {}: {} records ({} new or changed, {} unchanged)",
            self.bold(&report.category),
            report.seen,
            report.changed,
            report.unchanged
        );
        if let Some(err) = &report.stopped {
            line.push_str(&format!("\n  {}", self.red(&err.to_string())));
        }
        line
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Formats a product table.
    pub fn format_products(&self, records: &[CatalogRecord]) -> String {
        if records.is_empty() {
            return self.yellow("No products found");
        }

        let mut lines = vec![
            self.bold(&format!(
                "{:<10} {:<width$} {:<20} {:>9} {}",
                "ID",
                "Name",
                "Brand",
                "Price",
                "Category",
                width = NAME_WIDTH
            )),
            "─".repeat(NAME_WIDTH + 55),
        ];
        for record in records {
            let price = format_price(record.current_price);
            let price = if record.is_on_sale() {
                self.green(&format!("{price:>9}"))
            } else {
                format!("{price:>9}")
            };
            lines.push(format!(
                "{:<10} {:<width$} {:<20} {} {}",
                record.external_id,
                truncate(&record.name, NAME_WIDTH),
                truncate(record.brand.as_deref().unwrap_or("N/A"), 20),
                price,
                record.category.as_deref().unwrap_or("N/A"),
                width = NAME_WIDTH
            ));
        }
        lines.join("\n")
    }

    /// Formats one record with its price history.
    pub fn format_record(&self, record: &CatalogRecord, history: &[PriceHistoryEntry]) -> String {
        let mut lines = vec![
            format!("{} ({})", self.bold(&record.name), record.external_id),
            "─".repeat(RULE_WIDTH),
        ];
        let optional = [
            ("Brand", record.brand.clone()),
            ("Category", record.category.clone()),
            ("Subcategory", record.subcategory.clone()),
            ("Volume", record.volume_ml.map(|v| format!("{v} ml"))),
            ("ABV", record.abv_percent.map(|a| format!("{a}%"))),
            ("Country", record.country_of_origin.clone()),
            ("URL", record.url.clone()),
        ];
        for (label, value) in optional {
            if let Some(value) = value {
                lines.push(format!("{:<12} {value}", format!("{label}:")));
            }
        }

        let mut price = format_price(record.current_price);
        if record.is_on_sale() {
            price = format!(
                "{} (was {})",
                self.green(&price),
                format_price(record.regular_price)
            );
        }
        lines.push(format!("{:<12} {price}", "Price:"));
        lines.push(format!(
            "{:<12} {}",
            "Last seen:",
            record.last_seen_at.format("%Y-%m-%d %H:%M UTC")
        ));

        if !history.is_empty() {
            lines.push(String::new());
            lines.push(self.dim("Price history:"));
            for entry in history {
                lines.push(format!(
                    "  {}  {}",
                    entry.observed_at.format("%Y-%m-%d"),
                    format_price(Some(entry.price))
                ));
            }
        }
        lines.join("\n")
    }

    /// Formats catalog statistics.
    pub fn format_stats(&self, stats: &CatalogStats) -> String {
        let mut lines = vec![self.bold("Catalog Statistics"), "─".repeat(RULE_WIDTH)];
        lines.push(format!("Total products:   {}", stats.total_records));
        for (category, count) in &stats.by_category {
            lines.push(format!("  {category:<16}{count}"));
        }
        lines.push(format!("On sale:          {}", stats.on_sale));
        lines.push(format!("Price changes:    {}", stats.price_history_entries));
        lines.push(format!("Recipes:          {}", stats.recipes));
        lines.push(format!("Cost calculations: {}", stats.cost_calculations));
        let last = stats.last_crawled_at.map_or_else(
            || self.dim("never"),
            |t| t.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        lines.push(format!("Last crawled:     {last}"));
        lines.join("\n")
    }

    // ========================================================================
    // Recipes
    // ========================================================================

    /// Formats one recipe.
    pub fn format_recipe(&self, recipe: &Recipe) -> String {
        let mut lines = vec![self.bold(&recipe.name)];
        if let Some(category) = &recipe.category {
            lines.push(format!("Category:     {category}"));
        }
        lines.push(format!("Serving size: {} ml", recipe.serving_size_ml));
        lines.push(String::new());
        for ingredient in &recipe.ingredients {
            lines.push(format!(
                "  - {} {}",
                ingredient.display_text,
                self.dim(&format!("[{}]", ingredient.kind))
            ));
        }
        lines.join("\n")
    }

    /// Formats a recipe table.
    pub fn format_recipe_list(&self, recipes: &[Recipe]) -> String {
        if recipes.is_empty() {
            return self.yellow("No recipes yet; try `barkeep recipe load-defaults`");
        }
        let mut lines = vec![
            self.bold(&format!("{:<24} {:<12} {}", "Recipe", "Category", "Ingredients")),
            "─".repeat(RULE_WIDTH),
        ];
        for recipe in recipes {
            lines.push(format!(
                "{:<24} {:<12} {}",
                truncate(&recipe.name, 24),
                recipe.category.as_deref().unwrap_or("N/A"),
                recipe.ingredients.len()
            ));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Costing
    // ========================================================================

    /// Formats a cost calculation with its breakdown.
    pub fn format_cost(&self, calc: &CostCalculation) -> String {
        let mut lines = vec![
            format!("{} Cost Breakdown ({})", self.bold(&calc.recipe_name), calc.tier),
            "─".repeat(RULE_WIDTH),
        ];

        for line in &calc.breakdown {
            let amount = line
                .amount_ml
                .map_or_else(String::new, |ml| format!(" ({ml} ml)"));
            let (detail, cost) = match &line.resolution {
                Resolution::Resolved {
                    name,
                    external_id,
                    ..
                } => {
                    let mut detail = format!("{} [{external_id}]", truncate(name, 30));
                    if line.tier_fallback {
                        detail.push_str(&self.dim(" (best match; tier empty)"));
                    }
                    (detail, money(line.item_cost.unwrap_or_default()))
                }
                Resolution::Estimated { cost_per_ml } => (
                    self.dim(&format!("estimate at {}/ml", money(*cost_per_ml))),
                    money(line.item_cost.unwrap_or_default()),
                ),
                Resolution::Unresolved => (self.red("no match"), self.red("?")),
            };
            lines.push(format!("  {}{amount}", line.display_text));
            lines.push(format!("      {detail} {cost}"));
            if let Some(savings) = line.savings_amount.filter(|s| *s > 0.0) {
                lines.push(format!("      {}", self.green(&format!("on sale, save {}", money(savings)))));
            }
        }

        lines.push(String::new());
        lines.push(format!("Total cost:      {}", self.bold(&money(calc.total_cost))));
        if let Some(per_ml) = calc.cost_per_ml {
            lines.push(format!("Cost per ml:     {}", money(per_ml)));
        }
        lines.push(format!(
            "Suggested price: {} ({}x markup)",
            self.green(&format!("${:.2}", calc.suggested_price)),
            calc.markup_multiplier
        ));
        lines.push(format!("Margin:          {}", money(calc.margin)));
        if calc.total_savings > 0.0 {
            lines.push(format!("Sale savings:    {}", self.green(&money(calc.total_savings))));
        }
        if !calc.is_complete() {
            lines.push(String::new());
            lines.push(self.red(&format!(
                "⚠ {} unresolved: {}",
                calc.unresolved_count,
                calc.unresolved_ingredients().join(", ")
            )));
            lines.push(self.dim("  Totals exclude unresolved ingredients."));
        }
        lines.join("\n")
    }

    /// Formats the per-tier totals side by side.
    pub fn format_cost_options(&self, options: &[CostCalculation]) -> String {
        let mut lines = vec![self.bold("Cost options:")];
        for calc in options {
            let note = if calc.is_complete() {
                String::new()
            } else {
                self.red(&format!(" ({} unresolved)", calc.unresolved_count))
            };
            lines.push(format!(
                "  {:<11} {:>10}  suggested ${:.2}{note}",
                calc.tier.to_string(),
                money(calc.total_cost),
                calc.suggested_price
            ));
        }
        lines.join("\n")
    }

    /// Formats stored calculations, most recent first.
    pub fn format_history(&self, recipe: &str, history: &[CostCalculation]) -> String {
        if history.is_empty() {
            return self.yellow(&format!("No cost calculations for {recipe} yet"));
        }
        let mut lines = vec![
            self.bold(&format!("{recipe} Cost History")),
            "─".repeat(RULE_WIDTH),
        ];
        for calc in history {
            let note = if calc.is_complete() {
                String::new()
            } else {
                self.red(&format!(" ({} unresolved)", calc.unresolved_count))
            };
            lines.push(format!(
                "{}  {:<11} {:>10}{note}",
                calc.computed_at.format("%Y-%m-%d %H:%M"),
                calc.tier.to_string(),
                money(calc.total_cost)
            ));
        }
        lines.join("\n")
    }

    /// Formats a match verification report.
    pub fn format_verification(&self, recipe: &str, reports: &[IngredientReport]) -> String {
        let mut lines = vec![
            self.bold(&format!("{recipe} Match Verification")),
            "─".repeat(RULE_WIDTH),
        ];
        for report in reports {
            lines.push(self.bold(&report.display_text));
            if report.estimated {
                lines.push(format!("  {}", self.dim("priced from the mixer table")));
                continue;
            }
            if report.candidates.is_empty() {
                lines.push(format!("  {}", self.red("no matching products")));
                continue;
            }
            for candidate in &report.candidates {
                let checks = &candidate.checks;
                lines.push(format!(
                    "  {} [{}] score {} ({})",
                    truncate(&candidate.name, NAME_WIDTH),
                    candidate.external_id,
                    candidate.score,
                    candidate.quality
                ));
                lines.push(format!(
                    "    category {}  abv {}  brand {}  name {}",
                    self.check(checks.category_match),
                    self.check(checks.abv_sufficient),
                    self.check(checks.brand_match),
                    self.check(checks.name_similarity)
                ));
                for issue in &candidate.issues {
                    lines.push(format!("    {}", self.yellow(issue)));
                }
            }
        }
        lines.join("\n")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn check(&self, passed: bool) -> String {
        if passed {
            self.green("✓")
        } else {
            self.red("✗")
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Formats a currency amount with two to four decimals.
pub fn money(value: f64) -> String {
    let mut s = format!("{value:.4}");
    while s.ends_with('0') && s.len() - s.find('.').unwrap_or(s.len()) > 3 {
        s.pop();
    }
    format!("${s}")
}

fn format_price(price: Option<f64>) -> String {
    price.map_or_else(|| "N/A".to_string(), |p| format!("${p:.2}"))
}

/// Shortens `text` to `width` characters, ending in "...".
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

// ============================================================================
// Tests
// ============================================================================
