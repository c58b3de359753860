use crate::error::ChatError;
use crate::remote::Message;

#[derive(Debug)]
pub enum AppEvent {
    VerifyFinished {
        passphrase: String,
        result: Result<bool, ChatError>,
    },
    MessagesFetched(Result<Vec<Message>, ChatError>),
    SendFinished(Result<Message, ChatError>),
    ClearFinished(Result<(), ChatError>),
    PassphraseChanged {
        passphrase: String,
        result: Result<(), ChatError>,
    },
}
