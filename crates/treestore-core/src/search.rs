//! Search: substring scan and name ordering
//!
//! Matching is an exact, case-sensitive substring test over the textual
//! attributes plus the decimal rendering of the numeric ones. Results are
//! ordered by name with a collation that groups accented Latin letters with
//! their base letter, so "Érable" sorts next to "Epicéa" rather than after
//! "Zelkova".

use std::cmp::Ordering;

use crate::tree::Tree;

/// Returns true if `term` appears in at least one searchable attribute.
///
/// Absent attributes are skipped.
pub fn matches(tree: &Tree, term: &str) -> bool {
    let text_fields = [
        Some(tree.name.as_str()),
        tree.common_name.as_deref(),
        tree.botanic_name.as_deref(),
        tree.outstanding_qualification.as_deref(),
        tree.summary.as_deref(),
        tree.description.as_deref(),
        tree.genus.as_deref(),
        tree.species.as_deref(),
        tree.variety.as_deref(),
        tree.address.as_deref(),
        tree.address_bis.as_deref(),
    ];
    if text_fields.iter().flatten().any(|field| field.contains(term)) {
        return true;
    }

    let numeric_fields = [
        tree.height.map(|v| v.to_string()),
        tree.circumference.map(|v| v.to_string()),
        tree.plantation_year.map(|v| v.to_string()),
    ];
    numeric_fields.iter().flatten().any(|field| field.contains(term))
}

/// Locale-aware name comparison.
///
/// Primary level ignores case and Latin diacritics; ties are broken by
/// accent and then by the raw string, so the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let primary = primary_key(a).cmp(primary_key(b));
    if primary != Ordering::Equal {
        return primary;
    }
    let secondary = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    if secondary != Ordering::Equal {
        return secondary;
    }
    // Lowercase before uppercase at the tertiary level
    b.cmp(a)
}

/// Filter `trees` by `term` and sort the survivors by name.
///
/// The sort is stable: records with identical names keep their input order.
pub fn search<'a, I>(trees: I, term: &str) -> Vec<Tree>
where
    I: IntoIterator<Item = &'a Tree>,
{
    let mut results: Vec<Tree> = trees
        .into_iter()
        .filter(|tree| matches(tree, term))
        .cloned()
        .collect();
    results.sort_by(|a, b| compare_names(&a.name, &b.name));
    results
}

fn primary_key(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(fold_char)
}

/// Case and diacritic folding for the primary collation level.
fn fold_char(c: char) -> FoldedChar {
    let folded: &'static str = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' | 'Ÿ' => "y",
        'ß' => "ss",
        _ => return FoldedChar::Single(c.to_lowercase()),
    };
    FoldedChar::Static(folded.chars())
}

enum FoldedChar {
    Single(std::char::ToLowercase),
    Static(std::str::Chars<'static>),
}

impl Iterator for FoldedChar {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            FoldedChar::Single(it) => it.next(),
            FoldedChar::Static(it) => it.next(),
        }
    }
}
