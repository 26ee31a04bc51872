use crate::xml::errors::QueryError;
use crate::xml::tree::Element;
use std::fmt;

/// Attribute equality test inside a step, e.g. `[@name='scanlines']`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    pub attribute: String,
    pub value: String,
}

impl Predicate {
    fn matches(&self, element: &Element) -> bool {
        element.attribute(&self.attribute) == Some(self.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// `.` - the context node itself
    Current,
    /// `name[@attr='value']...` - direct children by name and attributes
    Child {
        name: String,
        predicates: Vec<Predicate>,
    },
}

impl Step {
    fn matches(&self, element: &Element) -> bool {
        match self {
            Step::Current => true,
            Step::Child { name, predicates } => {
                element.name == *name && predicates.iter().all(|p| p.matches(element))
            }
        }
    }
}

/// A structural path query evaluated relative to a context element.
///
/// Supports the subset `./tag`, `tag[@attr='value']` and `/`-separated
/// compositions of those. The first child step selects children of the
/// context element, so `./view/image` run against `<theme>` finds
/// `theme > view > image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathQuery {
    steps: Vec<Step>,
}

impl PathQuery {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }
        if trimmed.starts_with('/') {
            return Err(QueryError::Unsupported {
                input: input.to_string(),
                construct: "absolute path".to_string(),
            });
        }

        let steps = split_steps(trimmed)?
            .into_iter()
            .map(|raw| parse_step(input, &raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// All matching descendants of `context`, in document order.
    pub fn find_all<'a>(&self, context: &'a Element) -> Vec<&'a Element> {
        let mut current = vec![context];
        for step in &self.steps {
            current = match step {
                Step::Current => current,
                Step::Child { .. } => current
                    .into_iter()
                    .flat_map(move |node| {
                        node.children.iter().filter(move |child| step.matches(child))
                    })
                    .collect(),
            };
        }
        current
    }

    /// Visit every match mutably, in document order.
    ///
    /// All child steps move exactly one level down, so every match sits at
    /// the same depth and mutating one match never changes which of the
    /// remaining nodes match.
    pub fn for_each_match_mut<F>(&self, context: &mut Element, mut visit: F)
    where
        F: FnMut(&mut Element),
    {
        visit_mut(context, &self.steps, &mut visit);
    }

    pub fn count(&self, context: &Element) -> usize {
        self.find_all(context).len()
    }
}

fn visit_mut<F>(node: &mut Element, steps: &[Step], visit: &mut F)
where
    F: FnMut(&mut Element),
{
    let Some((step, rest)) = steps.split_first() else {
        visit(node);
        return;
    };
    match step {
        Step::Current => visit_mut(node, rest, visit),
        Step::Child { .. } => {
            for child in node.children.iter_mut().filter(|child| step.matches(child)) {
                visit_mut(child, rest, visit);
            }
        }
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 {
                write!(f, "/")?;
            }
            match step {
                Step::Current => write!(f, ".")?,
                Step::Child { name, predicates } => {
                    write!(f, "{name}")?;
                    for predicate in predicates {
                        write!(f, "[@{}='{}']", predicate.attribute, predicate.value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Split on `/` outside of brackets and quotes.
fn split_steps(input: &str) -> Result<Vec<String>, QueryError> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }

        match ch {
            '\'' | '"' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                if depth == 0 {
                    return Err(invalid(input, "unbalanced ']'"));
                }
                depth -= 1;
                current.push(ch);
            }
            '/' if depth == 0 => {
                if current.is_empty() {
                    return Err(QueryError::Unsupported {
                        input: input.to_string(),
                        construct: "empty step or '//'".to_string(),
                    });
                }
                steps.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }

    if quote.is_some() {
        return Err(invalid(input, "unterminated quoted value"));
    }
    if depth > 0 {
        return Err(invalid(input, "unterminated predicate"));
    }
    if current.is_empty() {
        return Err(invalid(input, "trailing '/'"));
    }
    steps.push(current);
    Ok(steps)
}

fn parse_step(input: &str, raw: &str) -> Result<Step, QueryError> {
    if raw == "." {
        return Ok(Step::Current);
    }
    if raw == ".." || raw.starts_with('*') {
        return Err(QueryError::Unsupported {
            input: input.to_string(),
            construct: raw.to_string(),
        });
    }

    let (name, mut rest) = match raw.find('[') {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, ""),
    };
    if !is_valid_name(name) {
        return Err(invalid(input, &format!("invalid element name '{name}'")));
    }

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        // quoted values may contain ']'
        let end =
            closing_bracket(rest).ok_or_else(|| invalid(input, "unterminated predicate"))?;
        predicates.push(parse_predicate(input, &rest[1..end])?);
        rest = &rest[end + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(invalid(input, "unexpected text after predicate"));
        }
    }

    Ok(Step::Child {
        name: name.to_string(),
        predicates,
    })
}

fn closing_bracket(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, ch) in rest.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ']') => return Some(idx),
            _ => {}
        }
    }
    None
}

fn parse_predicate(input: &str, body: &str) -> Result<Predicate, QueryError> {
    let body = body.trim();
    let Some(body) = body.strip_prefix('@') else {
        return Err(QueryError::Unsupported {
            input: input.to_string(),
            construct: format!("[{body}]"),
        });
    };
    let (attribute, value) = body
        .split_once('=')
        .ok_or_else(|| invalid(input, "predicate requires '='"))?;
    let attribute = attribute.trim();
    if !is_valid_name(attribute) {
        return Err(invalid(
            input,
            &format!("invalid attribute name '{attribute}'"),
        ));
    }

    let value = value.trim();
    let unquoted = ['\'', '"']
        .iter()
        .find_map(|q| {
            value
                .strip_prefix(*q)
                .and_then(|v| v.strip_suffix(*q))
                .filter(|v| !v.contains(*q))
        })
        .ok_or_else(|| invalid(input, "attribute value must be quoted"))?;

    Ok(Predicate {
        attribute: attribute.to_string(),
        value: unquoted.to_string(),
    })
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn invalid(input: &str, message: &str) -> QueryError {
    QueryError::Invalid {
        input: input.to_string(),
        message: message.to_string(),
    }
}
