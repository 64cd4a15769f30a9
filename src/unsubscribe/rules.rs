use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::browser::ControlSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    TextContains(&'static str),
    AttrEquals(&'static str, &'static str),
    AttrContains(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub label: &'static str,
    pub tags: &'static [&'static str],
    pub conditions: &'static [Condition],
}

impl Locator {
    pub fn matches(&self, control: &ControlSnapshot) -> bool {
        let tag_ok = self.tags.is_empty()
            || self
                .tags
                .iter()
                .any(|tag| control.tag.eq_ignore_ascii_case(tag));

        tag_ok
            && self
                .conditions
                .iter()
                .all(|condition| condition.holds(control))
    }

    pub fn first_match<'a>(&self, controls: &'a [ControlSnapshot]) -> Option<&'a ControlSnapshot> {
        controls.iter().find(|control| self.matches(control))
    }
}

impl Condition {
    fn holds(&self, control: &ControlSnapshot) -> bool {
        match *self {
            Condition::TextContains(needle) => contains_ignore_case(&control.text, needle),
            Condition::AttrEquals(name, expected) => control
                .attribute(name)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected)),
            Condition::AttrContains(name, needle) => control
                .attribute(name)
                .is_some_and(|value| contains_ignore_case(value, needle)),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

const fn rule(
    label: &'static str,
    tags: &'static [&'static str],
    conditions: &'static [Condition],
) -> Locator {
    Locator {
        label,
        tags,
        conditions,
    }
}

const BUTTON: &[&str] = &["button"];
const LINK: &[&str] = &["a"];
const INPUT: &[&str] = &["input"];
const ANY: &[&str] = &[];

pub const PRIMARY_RULES: &[Locator] = &[
    rule("unsubscribe button", BUTTON, &[Condition::TextContains("unsubscribe")]),
    rule("unsubscribe link", LINK, &[Condition::TextContains("unsubscribe")]),
    rule(
        "unsubscribe submit input",
        INPUT,
        &[
            Condition::AttrEquals("type", "submit"),
            Condition::AttrContains("value", "unsubscribe"),
        ],
    ),
    rule("opt out button", BUTTON, &[Condition::TextContains("opt out")]),
    rule("opt out link", LINK, &[Condition::TextContains("opt out")]),
    rule("remove button", BUTTON, &[Condition::TextContains("remove")]),
    rule("remove me link", LINK, &[Condition::TextContains("remove me")]),
    rule("unsubscribe class", ANY, &[Condition::AttrContains("class", "unsubscribe")]),
    rule("unsubscribe id", ANY, &[Condition::AttrContains("id", "unsubscribe")]),
];

pub const CONFIRM_RULES: &[Locator] = &[
    rule("confirm button", BUTTON, &[Condition::TextContains("confirm")]),
    rule("yes button", BUTTON, &[Condition::TextContains("yes")]),
    rule("submit button", BUTTON, &[Condition::TextContains("submit")]),
    rule("submit input", INPUT, &[Condition::AttrEquals("type", "submit")]),
];

pub const EMAIL_INPUT_RULES: &[Locator] = &[
    rule("email input", INPUT, &[Condition::AttrEquals("type", "email")]),
    rule("email-named input", INPUT, &[Condition::AttrContains("name", "email")]),
];

pub const FORM_SUBMIT_RULES: &[Locator] = &[
    rule("submit button", BUTTON, &[Condition::AttrEquals("type", "submit")]),
    rule("submit input", INPUT, &[Condition::AttrEquals("type", "submit")]),
];

const SUCCESS_PATTERNS: &[&str] = &[
    r"successfully unsubscribed",
    r"you have been unsubscribed",
    r"removed from.*list",
    r"no longer receive",
    r"won't receive",
    r"unsubscribe successful",
    r"preferences updated",
    r"email preferences saved",
];

static SUCCESS_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SUCCESS_PATTERNS
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("static success pattern")
        })
        .collect()
});

pub fn success_pattern(text: &str) -> Option<&'static str> {
    SUCCESS_REGEXES
        .iter()
        .zip(SUCCESS_PATTERNS)
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, pattern)| *pattern)
}

pub fn first_in<'a>(
    rules: &[Locator],
    controls: &'a [ControlSnapshot],
) -> Option<(&'static str, &'a ControlSnapshot)> {
    rules
        .iter()
        .find_map(|rule| rule.first_match(controls).map(|control| (rule.label, control)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(index: usize, tag: &str, text: &str, attrs: &[(&str, &str)]) -> ControlSnapshot {
        ControlSnapshot {
            index,
            tag: tag.to_string(),
            text: text.to_string(),
            attributes: attrs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn label_for(controls: &[ControlSnapshot]) -> Option<&'static str> {
        first_in(PRIMARY_RULES, controls).map(|(label, _)| label)
    }

    #[test]
    fn button_text_is_case_insensitive() {
        let controls = [control(0, "BUTTON", "UnSubscribe now", &[])];
        assert_eq!(label_for(&controls), Some("unsubscribe button"));
    }

    #[test]
    fn button_outranks_link_regardless_of_order() {
        let controls = [
            control(0, "a", "Unsubscribe", &[]),
            control(1, "button", "Unsubscribe", &[]),
        ];
        let (label, hit) = first_in(PRIMARY_RULES, &controls).unwrap();
        assert_eq!(label, "unsubscribe button");
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn submit_input_needs_type_and_value() {
        let plain = [control(0, "input", "", &[("value", "Unsubscribe")])];
        assert_eq!(label_for(&plain), None);

        let submit = [control(
            0,
            "input",
            "",
            &[("type", "submit"), ("value", "Unsubscribe me")],
        )];
        assert_eq!(label_for(&submit), Some("unsubscribe submit input"));
    }

    #[test]
    fn opt_out_and_remove_rules() {
        assert_eq!(
            label_for(&[control(0, "button", "Opt out of emails", &[])]),
            Some("opt out button")
        );
        assert_eq!(
            label_for(&[control(0, "a", "Opt Out", &[])]),
            Some("opt out link")
        );
        assert_eq!(
            label_for(&[control(0, "button", "Remove", &[])]),
            Some("remove button")
        );
        assert_eq!(
            label_for(&[control(0, "a", "Remove me from this list", &[])]),
            Some("remove me link")
        );
        assert_eq!(label_for(&[control(0, "a", "Remove", &[])]), None);
    }

    #[test]
    fn class_and_id_rules_match_any_tag() {
        assert_eq!(
            label_for(&[control(0, "div", "", &[("class", "btn js-Unsubscribe")])]),
            Some("unsubscribe class")
        );
        assert_eq!(
            label_for(&[control(0, "span", "", &[("id", "unsubscribe-all")])]),
            Some("unsubscribe id")
        );
    }

    #[test]
    fn unrelated_controls_do_not_match() {
        let controls = [
            control(0, "a", "Privacy policy", &[("href", "/privacy")]),
            control(1, "button", "Subscribe", &[]),
        ];
        assert_eq!(label_for(&controls), None);
    }

    #[test]
    fn confirm_rules_in_order() {
        let controls = [
            control(0, "input", "", &[("type", "submit")]),
            control(1, "button", "Yes, I'm sure", &[]),
        ];
        let (label, hit) = first_in(CONFIRM_RULES, &controls).unwrap();
        assert_eq!(label, "yes button");
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn email_form_rules() {
        let controls = [
            control(0, "input", "", &[("name", "user_email")]),
            control(1, "button", "Go", &[("type", "submit")]),
        ];
        assert!(first_in(EMAIL_INPUT_RULES, &controls).is_some());
        let (_, submit) = first_in(FORM_SUBMIT_RULES, &controls).unwrap();
        assert_eq!(submit.index, 1);
    }

    #[test]
    fn success_patterns() {
        assert_eq!(
            success_pattern("You have been SUCCESSFULLY unsubscribed."),
            Some("successfully unsubscribed")
        );
        assert_eq!(
            success_pattern("You were removed from our mailing list"),
            Some("removed from.*list")
        );
        assert_eq!(
            success_pattern("You won't receive these emails anymore"),
            Some("won't receive")
        );
        assert_eq!(success_pattern("Email preferences saved"), Some("email preferences saved"));
        assert_eq!(success_pattern("Manage your subscription"), None);
    }
}
