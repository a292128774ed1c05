mod messages_request;
mod messages_response;

pub use messages_request::{
    AnthropicContent, AnthropicContentBlock, AnthropicImageSource, AnthropicMessage,
    AnthropicMessagesRequest, AnthropicSystem, AnthropicSystemBlock,
};
pub use messages_response::{
    AnthropicContentBlockDelta, AnthropicMessageDelta, AnthropicMessageStart,
    AnthropicMessagesResponse, AnthropicResponseBlock, AnthropicStopDelta, AnthropicTextDelta,
    AnthropicUsage,
};
