/// A parsed documentation comment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocComment {
    /// The first paragraph, joined into one line.
    pub short_description: Option<String>,
    /// Documented parameters, in the order they appear.
    pub params: Vec<DocParam>,
}

/// One entry of a documented parameter list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocParam {
    /// The parameter name as written in the documentation.
    pub name: String,
    /// The description, continuation lines joined with spaces.
    pub description: String,
}

const PARAM_SECTIONS: &[&str] = &[
    "args:",
    "arguments:",
    "parameters:",
    "params:",
    "# arguments",
    "# parameters",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Summary,
    AfterSummary,
    Params { indent: usize },
    OtherSection,
}

impl DocComment {
    /// Parses a documentation comment.
    ///
    /// Three parameter list styles are recognized:
    ///
    /// - Google style: an `Args:` (or `Arguments:`, `Parameters:`) header
    ///   followed by indented `name (type): description` lines;
    /// - rustdoc style: a `# Arguments` header followed by
    ///   `` * `name` - description `` items;
    /// - reST style: `:param name: description` lines anywhere.
    ///
    /// Anything that doesn't fit is ignored rather than rejected.
    pub fn parse(doc: &str) -> Self {
        let mut summary: Vec<&str> = vec![];
        let mut params: Vec<DocParam> = vec![];
        let mut state = State::Summary;
        let mut entry_indent = None;

        for line in doc.lines() {
            let trimmed = line.trim();
            let indent = line.len() - line.trim_start().len();

            if let Some(param) = parse_rest_param(trimmed) {
                params.push(param);
                entry_indent = Some(indent);
                state = State::AfterSummary;
                continue;
            }

            if is_param_header(trimmed) {
                state = State::Params { indent };
                entry_indent = None;
                continue;
            }
            // `name:` inside a parameter list starts an entry.
            let in_param_list = matches!(
                state,
                State::Params { indent: header } if indent > header
            );
            if !in_param_list && is_section_header(trimmed) {
                state = State::OtherSection;
                continue;
            }

            match state {
                State::Summary => {
                    if trimmed.is_empty() {
                        if !summary.is_empty() {
                            state = State::AfterSummary;
                        }
                    } else {
                        summary.push(trimmed);
                    }
                }
                State::Params { indent: header_indent } => {
                    if trimmed.is_empty() {
                        continue;
                    }
                    let is_continuation = entry_indent
                        .is_some_and(|entry_indent| indent > entry_indent);
                    if is_continuation {
                        if let Some(last) = params.last_mut() {
                            push_words(&mut last.description, trimmed);
                        }
                        continue;
                    }
                    if let Some(param) = parse_list_param(trimmed) {
                        params.push(param);
                        entry_indent = Some(indent);
                    } else if indent <= header_indent
                        && !trimmed.starts_with(['*', '-'])
                    {
                        state = State::OtherSection;
                    }
                }
                State::AfterSummary | State::OtherSection => {
                    // A continuation of a reST entry.
                    let is_continuation = !trimmed.is_empty()
                        && entry_indent
                            .is_some_and(|entry_indent| indent > entry_indent);
                    if is_continuation && state == State::AfterSummary {
                        if let Some(last) = params.last_mut() {
                            push_words(&mut last.description, trimmed);
                        }
                    }
                }
            }
        }

        let short_description =
            (!summary.is_empty()).then(|| summary.join(" "));
        Self {
            short_description,
            params,
        }
    }
}

fn is_param_header(trimmed: &str) -> bool {
    let lower = trimmed.to_ascii_lowercase();
    PARAM_SECTIONS.contains(&lower.as_str())
}

fn is_section_header(trimmed: &str) -> bool {
    if trimmed.starts_with('#') {
        return true;
    }
    let Some(name) = trimmed.strip_suffix(':') else {
        return false;
    };
    !name.is_empty() && name.chars().all(char::is_alphabetic)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|ch| ch.is_alphanumeric() || ch == '_')
}

/// `:param name: text` or `:param type name: text`.
fn parse_rest_param(trimmed: &str) -> Option<DocParam> {
    let rest = trimmed.strip_prefix(":param")?;
    let (head, description) = rest.split_once(':')?;
    let name = head.split_whitespace().last()?;
    is_identifier(name).then(|| DocParam {
        name: name.to_owned(),
        description: description.trim().to_owned(),
    })
}

/// `name (type): text`, `name: text`, or `` * `name` - text ``.
fn parse_list_param(trimmed: &str) -> Option<DocParam> {
    let item = trimmed
        .strip_prefix(['*', '-'])
        .map(str::trim_start)
        .unwrap_or(trimmed);

    if let Some(quoted) = item.strip_prefix('`') {
        let (name, rest) = quoted.split_once('`')?;
        let description = rest
            .trim_start()
            .trim_start_matches(['-', ':', '—'])
            .trim();
        return is_identifier(name).then(|| DocParam {
            name: name.to_owned(),
            description: description.to_owned(),
        });
    }

    let (head, description) = item.split_once(':')?;
    let name = head.split_whitespace().next()?.trim_start_matches('*');
    is_identifier(name).then(|| DocParam {
        name: name.to_owned(),
        description: description.trim().to_owned(),
    })
}

fn push_words(description: &mut String, words: &str) {
    if !description.is_empty() {
        description.push(' ');
    }
    description.push_str(words);
}
