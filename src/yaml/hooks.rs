//! Node visitors run before decoding
//!
//! A hook sees every node of a document in pre-order together with its field
//! path and may rewrite it in place. Mapping values are reported with the
//! position of their key, sequence items with their own position.

use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};

use super::node::{Node, NodeKind};
use crate::warning::Mark;

/// Callback invoked for every node with its path and position
pub type DecoderHook = Arc<dyn Fn(&[String], Mark, &mut Node) + Send + Sync>;

/// Visit `node` and all of its descendants in pre-order
///
/// The root is visited with an empty path. Children are visited after their
/// parent, so rewrites made by the visitor are seen by the walk.
pub fn walk(node: &mut Node, visit: &mut dyn FnMut(&[String], Mark, &mut Node)) {
    let mut path = Vec::new();
    let mark = node.mark;
    visit(&path, mark, node);
    walk_children(node, &mut path, visit);
}

fn walk_children(node: &mut Node, path: &mut Vec<String>, visit: &mut dyn FnMut(&[String], Mark, &mut Node)) {
    match &mut node.kind {
        NodeKind::Mapping(entries) => {
            for entry in entries {
                path.push(entry.key.scalar_value().to_string());
                visit(path, entry.key.mark, &mut entry.value);
                walk_children(&mut entry.value, path, visit);
                path.pop();
            }
        }
        NodeKind::Sequence(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                path.push(index.to_string());
                let mark = item.mark;
                visit(path, mark, item);
                walk_children(item, path, visit);
                path.pop();
            }
        }
        NodeKind::Scalar { .. } => {}
    }
}

/// Combine hooks into one that runs them in order
///
/// Returns `None` when there is nothing to run.
pub fn multi_decoder_hook(hooks: impl IntoIterator<Item = DecoderHook>) -> Option<DecoderHook> {
    let mut hooks: Vec<DecoderHook> = hooks.into_iter().collect();
    match hooks.len() {
        0 => None,
        1 => hooks.pop(),
        _ => {
            let combined: DecoderHook = Arc::new(move |path: &[String], mark: Mark, node: &mut Node| {
                for hook in &hooks {
                    hook(path, mark, node);
                }
            });
            Some(combined)
        }
    }
}

/// Hook expanding `$VAR` and `${VAR}` in string scalars from the process
/// environment
pub fn env_decoder_hook() -> DecoderHook {
    env_decoder_hook_with(|name| std::env::var(name).ok())
}

/// Hook expanding variables through `lookup`; unknown variables expand to
/// the empty string
pub fn env_decoder_hook_with<F>(lookup: F) -> DecoderHook
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    Arc::new(move |_path: &[String], _mark: Mark, node: &mut Node| {
        if !node.is_string() {
            return;
        }
        let value = node.scalar_value();
        if !value.contains('$') {
            return;
        }
        let expanded = expand_env(value, &lookup);
        node.set_value(expanded);
    })
}

/// Replace `$VAR` and `${VAR}` references in `value`
///
/// Follows shell rules: a digit or one of `*#$@!?-` after `$` is a
/// one-character name, `${}` and an unterminated `${` are dropped, and a `$`
/// followed by anything else is kept. Unset variables expand to nothing.
pub fn expand_env(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    static VARIABLE: OnceLock<Regex> = OnceLock::new();
    let variable = VARIABLE.get_or_init(|| {
        Regex::new(r"\$(?:\{([*#$@!?\-0-9])\}|\{([^}]*)\}|([*#$@!?\-0-9])|([A-Za-z0-9_]+)|\{)")
            .expect("variable pattern is valid")
    });
    variable
        .replace_all(value, |caps: &Captures| {
            match (1..=4).find_map(|i| caps.get(i)).map(|m| m.as_str()) {
                Some(name) if !name.is_empty() => lookup(name).unwrap_or_default(),
                _ => String::new(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::node::load_documents;
    use std::sync::Mutex;

    fn load(source: &str) -> Node {
        load_documents(source).unwrap().remove(0)
    }

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HOST" => Some("example.com".to_string()),
            "PORT" => Some("8080".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_walk_reports_paths_in_pre_order() {
        let mut doc = load("a:\n  b: 1\n  c:\n    - x\n    - y\nd: 2\n");
        let mut seen = Vec::new();
        walk(&mut doc, &mut |path, mark, _| seen.push((path.join("."), mark.line)));
        assert_eq!(
            seen,
            vec![
                (String::new(), 1),
                ("a".to_string(), 1),
                ("a.b".to_string(), 2),
                ("a.c".to_string(), 3),
                ("a.c.0".to_string(), 4),
                ("a.c.1".to_string(), 5),
                ("d".to_string(), 6),
            ]
        );
    }

    #[test]
    fn test_sequence_item_mappings_use_item_position() {
        let mut doc = load("a:\n  - id: x\n");
        let mut seen = Vec::new();
        walk(&mut doc, &mut |path, mark, _| seen.push((path.join("."), mark)));
        assert_eq!(seen[2], ("a.0".to_string(), Mark::new(2, 5)));
        assert_eq!(seen[3], ("a.0.id".to_string(), Mark::new(2, 5)));
    }

    #[test]
    fn test_mapping_values_use_key_position() {
        let mut doc = load("key:   value\n");
        let mut marks = Vec::new();
        walk(&mut doc, &mut |path, mark, _| {
            if !path.is_empty() {
                marks.push(mark);
            }
        });
        assert_eq!(marks, vec![Mark::new(1, 1)]);
    }

    #[test]
    fn test_expand_env() {
        assert_eq!(expand_env("http://${HOST}:$PORT/", lookup), "http://example.com:8080/");
        assert_eq!(expand_env("$MISSING-x", lookup), "-x");
        assert_eq!(expand_env("plain", lookup), "plain");
    }

    #[test]
    fn test_expand_env_shell_names() {
        let lookup = |name: &str| match name {
            "1" => Some("first".to_string()),
            "_" => Some("underscore".to_string()),
            "HOST" => Some("example.com".to_string()),
            _ => None,
        };
        assert_eq!(expand_env("$1x and ${1}", lookup), "firstx and first");
        assert_eq!(expand_env("$_/${HOST}", lookup), "underscore/example.com");
        assert_eq!(expand_env("costs $5", lookup), "costs ");
        assert_eq!(expand_env("a${}b", lookup), "ab");
        assert_eq!(expand_env("a${HOST", lookup), "aHOST");
        assert_eq!(expand_env("50 % $ off, $", lookup), "50 % $ off, $");
    }

    #[test]
    fn test_env_hook_only_touches_strings() {
        let hook = env_decoder_hook_with(lookup);
        let mut doc = load("url: \"${HOST}\"\nbare: $PORT\ncount: 3\n");
        walk(&mut doc, &mut |path, mark, node| hook(path, mark, node));
        assert_eq!(doc.entry("url").unwrap().value.as_str(), Some("example.com"));
        assert_eq!(doc.entry("bare").unwrap().value.as_str(), Some("8080"));
        assert_eq!(doc.entry("count").unwrap().value.as_str(), Some("3"));
    }

    #[test]
    fn test_multi_decoder_hook_runs_in_order() {
        assert!(multi_decoder_hook(Vec::new()).is_none());

        let calls = Arc::new(Mutex::new(Vec::new()));
        let hook = |name: &'static str| -> DecoderHook {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &[String], _: Mark, _: &mut Node| calls.lock().unwrap().push(name))
        };
        let combined = multi_decoder_hook([hook("first"), hook("second")]).unwrap();

        let mut node = Node::null(Mark::default());
        combined(&[], Mark::default(), &mut node);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }
}
