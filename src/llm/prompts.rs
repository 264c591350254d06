/// Prompt templates, keyed by an explicit language enumeration
use serde::{Deserialize, Serialize};

/// Languages with a full set of prompt templates
///
/// Every variant must provide every template; unknown language codes fall
/// back to `English`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PromptLanguage {
    #[default]
    English,
    Hindi,
}

impl PromptLanguage {
    /// Map a caption language code to a template language
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().split('-').next().unwrap_or("") {
            "hi" => PromptLanguage::Hindi,
            _ => PromptLanguage::default(),
        }
    }

    /// Detect the language of free text (any Devanagari code point means Hindi)
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
            PromptLanguage::Hindi
        } else {
            PromptLanguage::English
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PromptLanguage::English => "en",
            PromptLanguage::Hindi => "hi",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            PromptLanguage::English => {
                "You are a helpful AI assistant. Answer questions using the provided context."
            }
            PromptLanguage::Hindi => {
                "आप एक सहायक AI सहायक हैं। प्रदान किए गए संदर्भ का उपयोग करके प्रश्नों का उत्तर दें।"
            }
        }
    }

    /// Prompt asking the model to expand a short query for retrieval
    pub fn expansion_prompt(&self, query: &str) -> String {
        match self {
            PromptLanguage::English => format!(
                "You are an expert assistant. The user query below is too short for accurate search.\n\
                Please expand it into a more detailed version while preserving the original intent.\n\n\
                Original Query: {}\n\n\
                Expanded Version:",
                query
            ),
            PromptLanguage::Hindi => format!(
                "आप एक विशेषज्ञ सहायक हैं। नीचे दिया गया उपयोगकर्ता प्रश्न सटीक खोज के लिए बहुत छोटा है।\n\
                कृपया इसे मूल इरादे को संरक्षित करते हुए अधिक विस्तृत संस्करण में विस्तारित करें।\n\n\
                मूल प्रश्न: {}\n\n\
                विस्तारित संस्करण:",
                query
            ),
        }
    }

    /// Prompt asking the model for numbered multiple-choice question blocks
    ///
    /// The block markers (`Timestamp:`, `Seconds:`, `Watch at:`) stay in English
    /// for every language so the block parser can read them.
    pub fn quiz_prompt(&self, transcript_with_timestamps: &str, question_count: usize) -> String {
        let language_rule = match self {
            PromptLanguage::English => "Write the questions, options and explanations in English.",
            PromptLanguage::Hindi => {
                "Write the questions, options and explanations in Hindi, but keep the labels \
                 'Timestamp:', 'Seconds:', 'Watch at:' and 'Explanation:' exactly in English."
            }
        };

        format!(
            "I will provide you with a video transcript that includes timestamps.\n\
            Please generate {} high quality multiple choice questions (MCQs) based on the key concepts and topics discussed in the video.\n\n\
            Requirements:\n\
            1. Questions should test understanding of important concepts, not trivial details\n\
            2. Each question must be directly answerable from the transcript\n\
            3. Include 4 plausible options for each question (a, b, c, d)\n\
            4. Mark the correct answer with an asterisk (*)\n\
            5. For each question, include:\n   \
               - The original timestamp (HH:MM:SS,mmm)\n   \
               - The time in seconds (for the URL timestamp)\n   \
               - A URL with the timestamp (format: https://youtu.be/VIDEO_ID?t=SECONDSs)\n\
            6. Explain why the correct answer is correct, without timestamps in the explanation\n\
            7. {}\n\
            8. Format exactly as shown.\n\n\
            Example format:\n\
            1. What is X?\n\
            a) One\n\
            b) Two\n\
            c) Three*\n\
            d) Four\n\
            Timestamp: [00:01:30,000]\n\
            Seconds: 90\n\
            Watch at: https://youtu.be/VIDEO_ID?t=90s\n\
            Explanation: This is because...\n\n\
            Transcript with timestamps:\n{}",
            question_count, language_rule, transcript_with_timestamps
        )
    }

    /// Prompt asking for a tagged answer grounded in retrieved context (answers are always English)
    pub fn answer_prompt(question: &str, context: &str) -> String {
        format!(
            "Analyze the question and provide:\n\
            1. Your thinking process (marked with <thinking> tags)\n\
            2. A detailed answer in English based strictly on the context\n\
            3. Key points from each relevant chunk\n\
            4. Include timestamps where this information appears in the video\n\n\
            Question: {}\n\n\
            Context:\n{}\n\n\
            IMPORTANT: Your answer must be in English, even if the context is in another language.\n\n\
            Format your response as:\n\
            <thinking>Your analytical process here</thinking>\n\
            <answer>Your structured answer in English here</answer>",
            question, context
        )
    }
}
