//! Line-oriented text codec for the navigation state
//!
//! Format, newline-terminated:
//!
//! ```text
//! <CurrentTypeToken>|<ParameterText>     ("|" alone when no current entry)
//! <N>
//! <TypeToken>|<ParameterText>   x N      (back stack, index 0 first)
//! <M>
//! <TypeToken>|<ParameterText>   x M      (forward stack, index 0 first)
//! ```
//!
//! Separator and newline characters inside a parameter's text form are not
//! escaped; a parameter containing either corrupts the format on restore.
//! This is a known limitation of the format, kept as-is.

use tracing::warn;

use crate::entry::{NavParameter, PageStackEntry, PageTypeId};
use crate::error::NavigationError;
use crate::page::PageFactory;

/// Field separator between a type token and its parameter text
pub const FIELD_SEPARATOR: char = '|';

/// Parsed navigation state, entries not yet realized as pages
#[derive(Debug, Default)]
pub struct RestoredState {
    pub current: Option<(PageTypeId, NavParameter)>,
    pub back: Vec<(PageTypeId, NavParameter)>,
    pub forward: Vec<(PageTypeId, NavParameter)>,
}

/// Render the full navigation state as text.
///
/// Fails if any parameter lacks a text form.
pub fn serialize(
    current: Option<&PageStackEntry>,
    back: &[&PageStackEntry],
    forward: &[&PageStackEntry],
) -> Result<String, NavigationError> {
    let mut out = String::new();

    match current {
        Some(entry) => push_entry_line(&mut out, entry)?,
        None => {
            out.push(FIELD_SEPARATOR);
            out.push('\n');
        }
    }

    out.push_str(&format!("{}\n", back.len()));
    for entry in back {
        push_entry_line(&mut out, entry)?;
    }

    out.push_str(&format!("{}\n", forward.len()));
    for entry in forward {
        push_entry_line(&mut out, entry)?;
    }

    Ok(out)
}

/// Parse serialized navigation state.
///
/// Entries whose type token `factory` cannot resolve are skipped with a
/// diagnostic; parsing continues. Missing or non-numeric count lines are
/// fatal.
pub fn parse(text: &str, factory: &dyn PageFactory) -> Result<RestoredState, NavigationError> {
    let mut lines = text.lines();
    let mut restored = RestoredState::default();

    let first = lines
        .next()
        .ok_or_else(|| NavigationError::MalformedState("missing current-entry line".into()))?;

    if !first.starts_with(FIELD_SEPARATOR) {
        let (token, parameter) = split_entry_line(first);
        if factory.can_create(&token) {
            restored.current = Some((token, parameter));
        } else {
            warn!(token = %token, "skipping unresolvable current entry");
        }
    }

    restored.back = parse_stack(&mut lines, factory, "back")?;
    restored.forward = parse_stack(&mut lines, factory, "forward")?;

    Ok(restored)
}

fn parse_stack<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    factory: &dyn PageFactory,
    which: &str,
) -> Result<Vec<(PageTypeId, NavParameter)>, NavigationError> {
    let count_line = lines.next().ok_or_else(|| {
        NavigationError::MalformedState(format!("missing {which}-stack count"))
    })?;
    let count: usize = count_line.trim().parse().map_err(|_| {
        NavigationError::MalformedState(format!("invalid {which}-stack count '{count_line}'"))
    })?;

    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let line = lines.next().ok_or_else(|| {
            NavigationError::MalformedState(format!(
                "{which} stack promises {count} entries, found {index}"
            ))
        })?;
        let (token, parameter) = split_entry_line(line);
        if factory.can_create(&token) {
            entries.push((token, parameter));
        } else {
            warn!(token = %token, stack = which, "skipping unresolvable entry");
        }
    }
    Ok(entries)
}

fn push_entry_line(out: &mut String, entry: &PageStackEntry) -> Result<(), NavigationError> {
    let parameter = entry
        .parameter()
        .text_form()
        .ok_or_else(|| NavigationError::UnsupportedParameter(entry.source_type().clone()))?;
    out.push_str(&format!(
        "{}{}{}\n",
        entry.source_type(),
        FIELD_SEPARATOR,
        parameter
    ));
    Ok(())
}

fn split_entry_line(line: &str) -> (PageTypeId, NavParameter) {
    match line.split_once(FIELD_SEPARATOR) {
        Some((token, parameter)) => (token.into(), NavParameter::from_text(parameter)),
        None => (line.into(), NavParameter::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Page, PageRegistry};
    use std::any::Any;
    use std::sync::Arc;

    struct TestPage {
        ty: PageTypeId,
    }

    impl Page for TestPage {
        fn source_type(&self) -> PageTypeId {
            self.ty.clone()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry(types: &[&str]) -> PageRegistry {
        let mut registry = PageRegistry::new();
        for ty in types {
            let ty = PageTypeId::from(*ty);
            let captured = ty.clone();
            registry.register(ty, move || {
                Ok(Arc::new(TestPage {
                    ty: captured.clone(),
                }))
            });
        }
        registry
    }

    fn entry(ty: &str, parameter: NavParameter) -> PageStackEntry {
        PageStackEntry::new(ty.into(), parameter, None)
    }

    #[test]
    fn test_serialize_exact_lines() {
        let current = entry("PageX", NavParameter::from("42"));
        let back = entry("PageY", NavParameter::None);

        let text = serialize(Some(&current), &[&back], &[]).unwrap();
        assert_eq!(text, "PageX|42\n1\nPageY|\n0\n");
    }

    #[test]
    fn test_serialize_no_current_entry() {
        let text = serialize(None, &[], &[]).unwrap();
        assert_eq!(text, "|\n0\n0\n");
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let factory = registry(&["app.a", "app.b", "app.c", "app.d"]);
        let current = entry("app.a", NavParameter::from("one"));
        let b0 = entry("app.b", NavParameter::from("two"));
        let b1 = entry("app.c", NavParameter::None);
        let f0 = entry("app.d", NavParameter::from("three"));

        let text = serialize(Some(&current), &[&b0, &b1], &[&f0]).unwrap();
        let restored = parse(&text, &factory).unwrap();

        let (ty, parameter) = restored.current.unwrap();
        assert_eq!(ty.as_str(), "app.a");
        assert_eq!(parameter, NavParameter::from("one"));

        let back: Vec<_> = restored
            .back
            .iter()
            .map(|(ty, _)| ty.as_str().to_string())
            .collect();
        assert_eq!(back, ["app.b", "app.c"]);
        assert_eq!(restored.back[1].1, NavParameter::None);

        assert_eq!(restored.forward.len(), 1);
        assert_eq!(restored.forward[0].0.as_str(), "app.d");
    }

    #[test]
    fn test_unresolvable_entries_are_skipped() {
        let factory = registry(&["app.a", "app.c"]);
        let text = "app.a|\n2\napp.gone|\napp.c|\n0\n";

        let restored = parse(text, &factory).unwrap();
        assert!(restored.current.is_some());
        assert_eq!(restored.back.len(), 1);
        assert_eq!(restored.back[0].0.as_str(), "app.c");
    }

    #[test]
    fn test_unresolvable_current_is_skipped() {
        let factory = registry(&["app.b"]);
        let text = "app.gone|\n1\napp.b|\n0\n";

        let restored = parse(text, &factory).unwrap();
        assert!(restored.current.is_none());
        assert_eq!(restored.back.len(), 1);
    }

    #[test]
    fn test_missing_count_is_fatal() {
        let factory = registry(&["app.a"]);
        assert!(matches!(
            parse("app.a|\n", &factory),
            Err(NavigationError::MalformedState(_))
        ));
    }

    #[test]
    fn test_non_numeric_count_is_fatal() {
        let factory = registry(&["app.a"]);
        assert!(matches!(
            parse("app.a|\nnot-a-number\n0\n", &factory),
            Err(NavigationError::MalformedState(_))
        ));
    }

    #[test]
    fn test_short_stack_is_fatal() {
        let factory = registry(&["app.a", "app.b"]);
        assert!(matches!(
            parse("app.a|\n3\napp.b|\n", &factory),
            Err(NavigationError::MalformedState(_))
        ));
    }

    #[test]
    fn test_opaque_parameter_cannot_serialize() {
        let current = PageStackEntry::new(
            "app.a".into(),
            NavParameter::Opaque(Arc::new(5usize)),
            None,
        );
        assert!(matches!(
            serialize(Some(&current), &[], &[]),
            Err(NavigationError::UnsupportedParameter(_))
        ));
    }

    #[test]
    fn test_separator_in_parameter_is_not_escaped() {
        let factory = registry(&["app.a"]);
        let current = entry("app.a", NavParameter::from("left|right"));

        let text = serialize(Some(&current), &[], &[]).unwrap();
        let restored = parse(&text, &factory).unwrap();

        // The first separator wins; the rest of the line stays in the text.
        let (_, parameter) = restored.current.unwrap();
        assert_eq!(parameter, NavParameter::from("left|right"));
    }
}
