/// Generated names for constraints and indexes declared without one
use crate::config::NamingConvention;
use crate::types::ConstraintKind;

/// Column placeholder used when a key is made only of expressions
const EXPRESSION_KEY: &str = "expr";

/// Expand a `{table}` / `{columns}` template.
///
/// With no columns the `_{columns}` part (or a bare `{columns}`) is dropped,
/// so `{table}_{columns}_check` becomes `orders_check`.
pub fn render(template: &str, table: &str, columns: &[&str]) -> String {
    let name = if columns.is_empty() {
        template.replace("_{columns}", "").replace("{columns}", "")
    } else {
        template.replace("{columns}", &columns.join("_"))
    };
    name.replace("{table}", table)
}

/// Base name for an unnamed constraint
pub fn constraint_name(naming: &NamingConvention, table: &str, columns: &[String], kind: &ConstraintKind) -> String {
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    match kind {
        ConstraintKind::PrimaryKey => render(&naming.primary_key, table, &columns),
        ConstraintKind::Unique { .. } => render(&naming.unique, table, &columns),
        ConstraintKind::ForeignKey(_) => render(&naming.foreign_key, table, &columns),
        ConstraintKind::Check { .. } => render(&naming.check, table, &columns),
        ConstraintKind::Exclusion(exclusion) => {
            let element_columns: Vec<&str> = exclusion.elements.iter().filter_map(|e| e.column.as_deref()).collect();
            if element_columns.is_empty() {
                render(&naming.exclusion, table, &[EXPRESSION_KEY])
            } else {
                render(&naming.exclusion, table, &element_columns)
            }
        }
    }
}

/// Base name for an unnamed index
pub fn index_name(naming: &NamingConvention, table: &str, key_columns: &[&str]) -> String {
    if key_columns.is_empty() {
        render(&naming.index, table, &[EXPRESSION_KEY])
    } else {
        render(&naming.index, table, key_columns)
    }
}

/// `base`, or `base1`, `base2`, ... for the first name `taken` rejects
pub fn unique_name<F>(base: String, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !taken(&base) {
        return base;
    }
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{}{}", base, suffix);
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
