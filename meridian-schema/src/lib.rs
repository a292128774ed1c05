pub mod antigravity;
pub mod anthropic;
pub mod canonical;
pub mod cloudcode;
pub mod gemini;
pub mod openai;

pub use antigravity::{AntigravityRequestBody, AntigravityRequestMeta};
pub use anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicContentBlockDelta, AnthropicImageSource,
    AnthropicMessage, AnthropicMessageDelta, AnthropicMessageStart, AnthropicMessagesRequest,
    AnthropicMessagesResponse, AnthropicResponseBlock, AnthropicStopDelta, AnthropicSystem,
    AnthropicSystemBlock, AnthropicTextDelta, AnthropicUsage,
};
pub use canonical::{
    CanonicalChoice, CanonicalChunk, CanonicalMessage, CanonicalPart, CanonicalRequest,
    CanonicalResponse, CanonicalUsage, FinishReason, Role,
};
pub use cloudcode::{CloudCodeRequest, CloudCodeRequestMeta, CloudCodeResponseBody};
pub use openai::{
    OpenaiChatChunk, OpenaiChatRequest, OpenaiChatResponse, OpenaiChoice, OpenaiChunkChoice,
    OpenaiChunkDelta, OpenaiMessage, OpenaiMessageContent, OpenaiResponseMessage, OpenaiStop,
    OpenaiUsage,
};
