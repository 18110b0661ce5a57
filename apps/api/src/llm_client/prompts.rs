// Cross-cutting prompt fragments and template rendering.
// Each stage that calls the LLM keeps its own prompts.rs alongside it.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Fills `{name}` placeholders in `template`. Unknown placeholders are left as-is.
///
/// Substitution is single-pass over the template, so values that happen to
/// contain `{...}` are never expanded again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_known_placeholders() {
        let out = render("Title: {title}\nAbstract: {abstract}", &[
            ("title", "Click Models"),
            ("abstract", "We study clicks."),
        ]);
        assert_eq!(out, "Title: Click Models\nAbstract: We study clicks.");
    }

    #[test]
    fn test_render_keeps_unknown_and_literal_braces() {
        let out = render("{\"score\": 0} {missing} {input}", &[("input", "x")]);
        assert_eq!(out, "{\"score\": 0} {missing} x");
    }

    #[test]
    fn test_render_does_not_expand_inside_values() {
        let out = render("{input}", &[("input", "{input}"), ("other", "y")]);
        assert_eq!(out, "{input}");
    }
}
