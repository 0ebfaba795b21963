use std::collections::BTreeSet;

use tracing::{error, info, warn};

use crate::{
    error::{DecodeError, RegistrationError},
    msm::{BareMsm, MsmObservables},
    parser::RawFrame,
};

/// Type tag of a [Decoded] result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ResultKind {
    Observables,
    BareMsm,
}

/// Output of a sub-decoder
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Decoded {
    Observables(MsmObservables),
    BareMsm(BareMsm),
}

impl Decoded {
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::Observables(_) => ResultKind::Observables,
            Self::BareMsm(_) => ResultKind::BareMsm,
        }
    }

    pub fn message_number(&self) -> u16 {
        match self {
            Self::Observables(obs) => obs.kind.message_number,
            Self::BareMsm(bare) => bare.kind.message_number,
        }
    }
}

/// Decoder for a family of messages, plugged into a [Decoder].
pub trait SubDecoder {
    /// Unique name of the handled subset, e.g. `MSM4567`
    fn subset(&self) -> &str;

    /// Message numbers this sub-decoder accepts
    fn implemented_messages(&self) -> &BTreeSet<u16>;

    /// Declared result type for `message_number`
    fn result_kind(&self, message_number: u16) -> Option<ResultKind>;

    fn decode(&self, frame: &RawFrame) -> Result<Decoded, DecodeError>;
}

/// Routes validated frames to the registered sub-decoders and keeps statistics.
#[derive(Default)]
pub struct Decoder {
    sub_decoders: Vec<Box<dyn SubDecoder>>,
    attempts: usize,
    successes: usize,
}

impl core::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Decoder")
            .field("subsets", &self.subsets().collect::<Vec<_>>())
            .field("attempts", &self.attempts)
            .field("successes", &self.successes)
            .finish()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sub-decoder after checking that it declares a non-empty
    /// message set, a unique subset name and a result type for every message.
    pub fn register<D: SubDecoder + 'static>(&mut self, sub: D) -> Result<(), RegistrationError> {
        let subset = sub.subset().to_string();
        if sub.implemented_messages().is_empty() {
            return Err(RegistrationError::EmptyMessageSet { subset });
        }
        if self.sub_decoders.iter().any(|d| d.subset() == subset) {
            return Err(RegistrationError::DuplicateSubset { subset });
        }
        if let Some(&message) = sub
            .implemented_messages()
            .iter()
            .find(|&&num| sub.result_kind(num).is_none())
        {
            return Err(RegistrationError::MissingResultKind { subset, message });
        }
        info!(
            subset = %subset,
            messages = sub.implemented_messages().len(),
            "sub-decoder registered"
        );
        self.sub_decoders.push(Box::new(sub));
        Ok(())
    }

    pub fn subsets(&self) -> impl Iterator<Item = &str> {
        self.sub_decoders.iter().map(|d| d.subset())
    }

    /// Whether some registered sub-decoder accepts `message_number`
    pub fn supports(&self, message_number: u16) -> bool {
        self.find(message_number).is_some()
    }

    fn find(&self, message_number: u16) -> Option<&dyn SubDecoder> {
        self.sub_decoders
            .iter()
            .find(|d| d.implemented_messages().contains(&message_number))
            .map(|d| &**d)
    }

    /// Decodes `frame`, surfacing the failure reason.
    ///
    /// Frames nobody handles yield [DecodeError::UnsupportedMessage] and leave
    /// the counters untouched. Every other outcome counts as one attempt.
    pub fn try_decode(&mut self, frame: &RawFrame) -> Result<Decoded, DecodeError> {
        let message = frame.message_number().ok_or_else(|| {
            DecodeError::structure(0, "frame too short for a message number")
        })?;
        let sub = self
            .sub_decoders
            .iter()
            .find(|d| d.implemented_messages().contains(&message))
            .ok_or(DecodeError::UnsupportedMessage { message })?;

        self.attempts += 1;
        let decoded = sub.decode(frame)?;
        // registration guarantees a declared kind
        let expected = sub.result_kind(message);
        if expected != Some(decoded.kind()) {
            return Err(DecodeError::ResultTypeMismatch {
                message,
                expected: expected.unwrap_or(decoded.kind()),
                got: decoded.kind(),
            });
        }
        self.successes += 1;
        Ok(decoded)
    }

    /// Decodes `frame`, logging and swallowing any failure.
    pub fn decode(&mut self, frame: &RawFrame) -> Option<Decoded> {
        if frame.message_number().is_none() {
            warn!(len = frame.len(), "frame too short for a message number");
            return None;
        }
        match self.try_decode(frame) {
            Ok(decoded) => Some(decoded),
            Err(DecodeError::UnsupportedMessage { message }) => {
                info!(message, "no sub-decoder for message");
                None
            },
            Err(err) => {
                error!(%err, "decoding failed");
                None
            },
        }
    }

    /// Frames routed to a sub-decoder
    pub fn dec_attempts(&self) -> usize {
        self.attempts
    }

    /// Frames decoded into the declared result type
    pub fn dec_successes(&self) -> usize {
        self.successes
    }

    pub fn dec_errors(&self) -> usize {
        self.attempts - self.successes
    }
}
