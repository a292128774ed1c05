//! Model-name suffix stripping (`spec.md` §4.5 / §9 open question).
//!
//! Clients may tag a model name with a bracketed hint (`gemini-2.5-pro[tag]`)
//! and/or a fake/real-stream marker (`-假流`/`-真流`). The suffixes are
//! stripped to recover the real upstream model name; the fake-stream marker
//! additionally sets a flag instructing the Dispatcher to buffer a
//! non-stream upstream call and reframe it as a single client-facing chunk
//! (decision recorded in DESIGN.md's Open Question Decisions).

const FAKE_STREAM_SUFFIX: &str = "-假流";
const REAL_STREAM_SUFFIX: &str = "-真流";

pub struct NormalizedModel {
    pub model: String,
    pub fake_stream: bool,
}

pub fn normalize(raw: &str) -> NormalizedModel {
    let mut model = raw.trim();
    let mut fake_stream = false;

    if let Some(stripped) = model.strip_suffix(FAKE_STREAM_SUFFIX) {
        model = stripped;
        fake_stream = true;
    } else if let Some(stripped) = model.strip_suffix(REAL_STREAM_SUFFIX) {
        model = stripped;
    }

    let model = strip_bracket_tag(model);

    NormalizedModel { model, fake_stream }
}

fn strip_bracket_tag(model: &str) -> String {
    match model.rfind('[') {
        Some(idx) if model.ends_with(']') => model[..idx].trim_end_matches('-').to_string(),
        _ => model.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_model_is_unchanged() {
        let n = normalize("gemini-2.5-pro");
        assert_eq!(n.model, "gemini-2.5-pro");
        assert!(!n.fake_stream);
    }

    #[test]
    fn fake_stream_suffix_sets_flag_and_strips() {
        let n = normalize("gemini-2.5-pro-假流");
        assert_eq!(n.model, "gemini-2.5-pro");
        assert!(n.fake_stream);
    }

    #[test]
    fn real_stream_suffix_strips_without_flag() {
        let n = normalize("gemini-2.5-pro-真流");
        assert_eq!(n.model, "gemini-2.5-pro");
        assert!(!n.fake_stream);
    }

    #[test]
    fn bracket_tag_is_stripped() {
        let n = normalize("gemini-2.5-pro-[cli]");
        assert_eq!(n.model, "gemini-2.5-pro");
    }
}
