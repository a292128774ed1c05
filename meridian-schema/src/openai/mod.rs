mod chat_request;
mod chat_response;
mod model_list;

pub use chat_request::{OpenaiChatRequest, OpenaiMessage, OpenaiMessageContent, OpenaiStop};
pub use chat_response::{
    OpenaiChatChunk, OpenaiChatResponse, OpenaiChoice, OpenaiChunkChoice, OpenaiChunkDelta,
    OpenaiResponseMessage, OpenaiUsage,
};
pub use model_list::{OpenaiModel, OpenaiModelList};
