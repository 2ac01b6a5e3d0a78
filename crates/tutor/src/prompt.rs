use crate::persistence::UserProfile;
use crate::settings::PromptSettings;
use concept_map::response::{ANSWER_MARKER, GRAPH_MARKER};

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build(
    profile: &UserProfile,
    settings: &PromptSettings,
    question: &str,
) -> Prompt {
    let subject = if profile.subject.is_empty() {
        String::new()
    } else {
        format!(" studying {}", profile.subject)
    };

    let system = format!(
        "You are a structured tutor for a class {class} student{subject}. \
Reply in {language}, using exactly two sections and nothing else.

{ANSWER_MARKER}
An age-appropriate explanation in fewer than {words} words that reads \
naturally when spoken aloud.

{GRAPH_MARKER}
Only a JSON object describing a hierarchical concept map:
{{
  \"visualization_type\": \"Concept Map\",
  \"main_concept\": \"topic\",
  \"nodes\": [{{\"id\": \"A\", \"label\": \"Topic\", \"category\": \"Main\"}}],
  \"edges\": [{{\"from\": \"A\", \"to\": \"B\", \"label\": \"relation\", \"id\": \"A->B\"}}],
  \"audioSegments\": [{{
    \"segmentIndex\": 0,
    \"spokenText\": \"excerpt of the answer\",
    \"estimatedDuration\": 3.5,
    \"highlightNodeIds\": [\"A\"],
    \"showNodeIds\": [\"A\"],
    \"highlightEdgeIds\": [],
    \"action\": \"introduce\"
  }}]
}}

Use one Main node, two or three Secondary nodes linked to it and Leaf \
nodes below those, about {nodes} nodes in total. Every edge id is \
\"FROM->TO\". Split the answer into ordered audio segments, at roughly \
two to three spoken words per second, revealing the root first and the \
rest progressively. Actions are introduce, expand or connect. No \
markdown and no text after the JSON.",
        class = profile.class,
        language = profile.language,
        words = settings.max_answer_words,
        nodes = settings.node_count,
    );

    Prompt {
        system,
        user: question.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_profile_and_limits() {
        let profile = UserProfile {
            class: 6,
            subject: "Science".to_string(),
            language: "Hindi".to_string(),
            ..UserProfile::default()
        };
        let settings = PromptSettings {
            node_count: 10,
            max_answer_words: 80,
        };
        let prompt = build(&profile, &settings, "  Why is the sky blue? ");

        assert_eq!(prompt.user, "Why is the sky blue?");
        assert!(prompt.system.contains("class 6 student studying Science"));
        assert!(prompt.system.contains("Reply in Hindi"));
        assert!(prompt.system.contains("fewer than 80 words"));
        assert!(prompt.system.contains("about 10 nodes"));
        assert!(prompt.system.contains(ANSWER_MARKER));
        assert!(prompt.system.contains(GRAPH_MARKER));
    }

    #[test]
    fn test_missing_subject_is_omitted() {
        let prompt = build(
            &UserProfile::default(),
            &PromptSettings::default(),
            "q",
        );
        assert!(prompt.system.contains("class 8 student. Reply"));
    }
}
