use crate::types::Episode;

const DIGEST_HEADER: &str = "Just released:";
const DIGEST_FOOTER: &str = "Enjoy!";

/// Plain-text "just released" message for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub body: String,
}

pub fn render_digest(subject: &str, episodes: &[Episode]) -> Digest {
    let lines: Vec<String> = episodes.iter().map(|episode| format!("- {}", episode)).collect();

    Digest {
        subject: subject.to_string(),
        body: format!("{}\n\n{}\n\n{}\n", DIGEST_HEADER, lines.join("\n"), DIGEST_FOOTER),
    }
}
