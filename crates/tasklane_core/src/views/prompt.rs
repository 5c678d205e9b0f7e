/// Label under which tasks without a live category are shown.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Confirmation text for deleting a category.
///
/// Deleting a category keeps its tasks; they are shown as uncategorized.
pub fn delete_category_prompt(category_name: &str, affected_tasks: usize) -> String {
    match affected_tasks {
        0 => format!("Are you sure you want to delete \"{category_name}\"?"),
        1 => format!(
            "Are you sure you want to delete \"{category_name}\"? Its 1 task will be kept and moved to {UNCATEGORIZED_LABEL}."
        ),
        count => format!(
            "Are you sure you want to delete \"{category_name}\"? Its {count} tasks will be kept and moved to {UNCATEGORIZED_LABEL}."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::delete_category_prompt;

    #[test]
    fn prompt_without_tasks_is_a_plain_question() {
        assert_eq!(
            delete_category_prompt("Meetings", 0),
            "Are you sure you want to delete \"Meetings\"?"
        );
    }

    #[test]
    fn prompt_describes_reassignment_not_deletion() {
        let one = delete_category_prompt("Planning", 1);
        assert!(one.contains("Its 1 task will be kept"));

        let many = delete_category_prompt("Planning", 3);
        assert!(many.contains("Its 3 tasks will be kept and moved to Uncategorized"));
        assert!(!many.contains("delete 3"));
    }
}
