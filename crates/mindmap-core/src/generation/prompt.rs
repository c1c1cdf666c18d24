use crate::model::mindmap::MapType;

/// Build the generation prompt for a request.
///
/// `text` is only used by [`MapType::Text`], which maps a supplied paragraph
/// rather than a topic.
pub fn build_prompt(map_type: MapType, topic: &str, text: Option<&str>) -> String {
    match map_type {
        MapType::Simple => format!(
            "Create a simple mermaid mind map for the topic: \"{topic}\".\n\n\
             ### Instructions:\n\
             - Use only mermaid mindmap syntax.\n\
             - Keep nodes simple and categorized properly.\n\
             - No explanation or text, only mermaid code in triple backticks.\n"
        ),
        MapType::Analogy => format!(
            "Create a mermaid mind map to explain the topic \"{topic}\" using analogies. \
             Use the mindmap syntax.\n\n\
             ### Instructions:\n\
             - Use creative and relatable analogies.\n\
             - Format output in mermaid mindmap code.\n\
             - No explanation, just mermaid code in triple backticks.\n\n\
             Topic: {topic}\n"
        ),
        MapType::Text => format!(
            "Given the following input text, generate a mermaid mind map code using the mindmap syntax.\n\n\
             ### Instructions:\n\
             - Use concise and meaningful nodes.\n\
             - Keep hierarchy clear and relevant.\n\
             - Only mermaid code, no explanations or comments.\n\
             - Wrap the output in triple backticks with 'mermaid' after the opening backticks.\n\n\
             ### Input Text:\n{}\n",
            text.filter(|t| !t.trim().is_empty()).unwrap_or(topic)
        ),
    }
}
