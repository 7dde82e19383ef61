/// Pick the label for a boolean flag
pub fn bool_label<'a>(value: bool, true_label: &'a str, false_label: &'a str) -> &'a str {
    if value {
        true_label
    } else {
        false_label
    }
}
