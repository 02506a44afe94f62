pub mod frame;
pub mod messages;
pub mod parser;

pub use frame::{
    build_binary_message, build_header, build_text_message, new_id, x_timestamp, Header,
};
pub use messages::{SpeechConfig, SpeechHypothesis, SpeechPhrase};
pub use parser::{parse_event, parse_message, route, ParsedMessage, SpeechEvent};
