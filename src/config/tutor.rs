use serde::{Deserialize, Serialize};

/// Fixed Arabic system prompt prepended to every completion request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "أنت مرشد، معلم ذكي باللغة العربية. \
مهمتك مساعدة الطلاب على فهم دروسهم في جميع المواد الدراسية. \
اشرح المفاهيم بلغة عربية فصيحة ومبسطة، وقدم أمثلة عملية، \
وشجع الطالب على التفكير بنفسه بدل إعطائه الإجابة مباشرة. \
إذا سُئلت عن موضوع غير تعليمي، أعد توجيه الحديث نحو التعلم بلطف.";

/// Reply returned when moderation flags the user message.
pub const DEFAULT_REFUSAL_REPLY: &str =
    "لا يمكنني المساعدة في هذا الموضوع. جرب سؤالاً تعليمياً آخر.";

/// Tutor persona and conversation shaping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TutorConfig {
    /// System prompt override.
    /// TOML: `tutor.system_prompt`. Default: the built-in Arabic tutor prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Reply used for moderation-flagged messages.
    /// TOML: `tutor.refusal_reply`.
    #[serde(default = "default_refusal_reply")]
    pub refusal_reply: String,

    /// Prior session messages included as upstream context.
    /// TOML: `tutor.history_limit`. Default: `20`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            refusal_reply: default_refusal_reply(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_refusal_reply() -> String {
    DEFAULT_REFUSAL_REPLY.to_string()
}

fn default_history_limit() -> usize {
    20
}
