mod client;
mod responses;

pub use client::OpenAiProvider;
pub use responses::{OutputContent, OutputItem, ResponsesDocument, SummaryText, Usage};

pub(crate) use client::{
    apply_chat_params, byte_stream, check_status, message_to_value,
    ChatDocument,
};
