//! Display ordering of a column's tasks.
//!
//! Favorites always come first. Under [`SortOption::Normal`] both groups
//! keep stored (manual) order; under `A-Z` / `Z-A` each group is sorted by
//! name. Stored order is never touched, and equal inputs always produce
//! the same output, since drag targets are computed from this ordering.

use std::cmp::Ordering;

use taskboard_proto::{SortOption, Task};

/// Projects a column's stored task list into display order.
#[must_use]
pub fn sorted_tasks(tasks: &[Task], sort_option: SortOption) -> Vec<&Task> {
    let (mut favorites, mut others): (Vec<&Task>, Vec<&Task>) =
        tasks.iter().partition(|t| t.is_favorite);

    match sort_option {
        SortOption::Normal => {}
        SortOption::Ascending => {
            favorites.sort_by(|a, b| compare_names(&a.name, &b.name));
            others.sort_by(|a, b| compare_names(&a.name, &b.name));
        }
        SortOption::Descending => {
            favorites.sort_by(|a, b| compare_names(&b.name, &a.name));
            others.sort_by(|a, b| compare_names(&b.name, &a.name));
        }
    }

    favorites.extend(others);
    favorites
}

/// Case-insensitive name order, falling back to exact comparison so
/// `"apple"` and `"Apple"` still order deterministically.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
