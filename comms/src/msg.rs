use std::{fmt, io};

use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::{Deserialize, Serialize};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_KIND: Header = 0;
const REQUEST_KIND: Header = 1;
const REPLY_KIND: Header = 2;
const BATCH_KIND: Header = 3;

/// The errors reported by a worker after a monitoring step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validation {
    pub valid_err: f64,
    pub test_err: f64,
}

/// A progress and/or validation report sent by a worker.
///
/// At least one of the two parts is always present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub progress: Option<u64>,
    pub validation: Option<Validation>,
}

/// A control request sent by a worker to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, SerdeSerialize, SerdeDeserialize)]
#[serde(try_from = "WireRequest", into = "WireRequest")]
pub enum Request {
    /// The `"next"` poll, asks for the next action to perform.
    PollNext,
    Report(Report),
}

impl Request {
    /// A report of `done` freshly trained minibatches.
    pub fn progress(done: u64) -> Self {
        Self::Report(Report {
            progress: Some(done),
            validation: None,
        })
    }

    /// A report of the errors obtained on the monitoring datasets.
    pub fn validation(valid_err: f64, test_err: f64) -> Self {
        Self::Report(Report {
            progress: None,
            validation: Some(Validation {
                valid_err,
                test_err,
            }),
        })
    }
}

/// The directive the coordinator answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerdeSerialize, SerdeDeserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    Train,
    Valid,
    Stop,
    Best,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Directive::Train => "train",
            Directive::Valid => "valid",
            Directive::Stop => "stop",
            Directive::Best => "best",
        };

        f.write_str(token)
    }
}

#[derive(SerdeSerialize, SerdeDeserialize)]
#[serde(untagged)]
enum WireRequest {
    Token(Token),
    Report(WireReport),
}

#[derive(SerdeSerialize, SerdeDeserialize)]
enum Token {
    #[serde(rename = "next")]
    Next,
}

#[derive(SerdeSerialize, SerdeDeserialize)]
#[serde(deny_unknown_fields)]
struct WireReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    done: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    valid_err: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_err: Option<f64>,
}

impl TryFrom<WireRequest> for Request {
    type Error = String;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        let report = match wire {
            WireRequest::Token(Token::Next) => return Ok(Self::PollNext),
            WireRequest::Report(report) => report,
        };

        let validation = match (report.valid_err, report.test_err) {
            (Some(valid_err), Some(test_err)) => Some(Validation {
                valid_err,
                test_err,
            }),
            (None, None) => None,
            (Some(_), None) => return Err("`valid_err` was sent without `test_err`".into()),
            (None, Some(_)) => return Err("`test_err` was sent without `valid_err`".into()),
        };

        if report.done.is_none() && validation.is_none() {
            return Err("a report must carry `done` or `valid_err`/`test_err`".into());
        }

        Ok(Self::Report(Report {
            progress: report.done,
            validation,
        }))
    }
}

impl From<Request> for WireRequest {
    fn from(req: Request) -> Self {
        match req {
            Request::PollNext => Self::Token(Token::Next),
            Request::Report(report) => Self::Report(WireReport {
                done: report.progress,
                valid_err: report.validation.map(|v| v.valid_err),
                test_err: report.validation.map(|v| v.test_err),
            }),
        }
    }
}

/// A dense row-major `f32` array of a minibatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Array {
    /// The amount of elements `shape` describes, `None` on overflow.
    fn elements(shape: &[usize]) -> Option<usize> {
        shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }
}

/// A minibatch pushed through the data channel, a list of arrays (inputs, targets, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Minibatch {
    pub arrays: Vec<Array>,
}

/// The application layer message for the control and data channels.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Request(Request),
    /// `None` is the silent reply, no directive applies.
    Reply(Option<Directive>),
    Err(String),
    Batch(Minibatch),
}

impl Msg {
    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_data<T>(detail: impl Into<String>) -> io::Result<T> {
        Err(io::Error::new(io::ErrorKind::InvalidData, detail.into()))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

/// Truncated json is still a malformed frame, never an end of stream.
fn from_json<'a, T: SerdeDeserialize<'a>>(buf: &'a [u8]) -> io::Result<T> {
    serde_json::from_slice(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

impl Serialize for Msg {
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        match self {
            Msg::Err(detail) => {
                buf.extend_from_slice(&ERR_KIND.to_be_bytes());
                buf.extend_from_slice(detail.as_bytes());
            }
            Msg::Request(req) => {
                // json has no encoding for them, they would decode as missing fields.
                if let Request::Report(Report {
                    validation: Some(v),
                    ..
                }) = req
                {
                    if !(v.valid_err.is_finite() && v.test_err.is_finite()) {
                        return Self::invalid_data(format!(
                            "non finite errors can't be sent, got valid {} test {}",
                            v.valid_err, v.test_err
                        ));
                    }
                }

                buf.extend_from_slice(&REQUEST_KIND.to_be_bytes());
                serde_json::to_writer(&mut *buf, req)?;
            }
            Msg::Reply(directive) => {
                buf.extend_from_slice(&REPLY_KIND.to_be_bytes());
                serde_json::to_writer(&mut *buf, directive)?;
            }
            Msg::Batch(batch) => serialize_batch(batch, buf)?,
        }

        Ok(())
    }
}

/// Layout: the kind, a `u32` length of the json shapes header, the shapes, then every
/// array's elements back to back in native byte order.
fn serialize_batch(batch: &Minibatch, buf: &mut Vec<u8>) -> io::Result<()> {
    let mut shapes = Vec::with_capacity(batch.arrays.len());

    for array in &batch.arrays {
        if Array::elements(&array.shape) != Some(array.data.len()) {
            return Msg::invalid_data(format!(
                "array of shape {:?} holds {} elements",
                array.shape,
                array.data.len()
            ));
        }
        shapes.push(&array.shape);
    }

    let header = serde_json::to_vec(&shapes)?;
    let header_len = Header::try_from(header.len())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    buf.extend_from_slice(&BATCH_KIND.to_be_bytes());
    buf.extend_from_slice(&header_len.to_be_bytes());
    buf.extend_from_slice(&header);

    for array in &batch.arrays {
        buf.extend_from_slice(bytemuck::cast_slice(&array.data));
    }

    Ok(())
}

fn deserialize_batch(buf: &[u8]) -> io::Result<Minibatch> {
    let Some((len_buf, rest)) = buf.split_first_chunk::<HEADER_SIZE>() else {
        return Msg::buf_is_too_small(buf.len());
    };

    let header_len = Header::from_be_bytes(*len_buf) as usize;
    if rest.len() < header_len {
        return Msg::invalid_data(format!(
            "batch header of {header_len} bytes, only {} left",
            rest.len()
        ));
    }

    let (header, mut data) = rest.split_at(header_len);
    let shapes: Vec<Vec<usize>> = from_json(header)?;

    let mut arrays = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let bytes = Array::elements(&shape)
            .and_then(|n| n.checked_mul(size_of::<f32>()))
            .filter(|&bytes| bytes <= data.len());

        let Some(bytes) = bytes else {
            return Msg::invalid_data(format!("array of shape {shape:?} overruns the frame"));
        };

        let (chunk, tail) = data.split_at(bytes);
        let mut values = vec![0f32; bytes / size_of::<f32>()];
        bytemuck::cast_slice_mut::<f32, u8>(&mut values).copy_from_slice(chunk);

        arrays.push(Array {
            shape,
            data: values,
        });
        data = tail;
    }

    if !data.is_empty() {
        return Msg::invalid_data(format!("{} trailing bytes after the batch", data.len()));
    }

    Ok(Minibatch { arrays })
}

impl Deserialize for Msg {
    fn deserialize(buf: &[u8]) -> io::Result<Self> {
        let Some((kind_buf, rest)) = buf.split_first_chunk::<HEADER_SIZE>() else {
            return Self::buf_is_too_small(buf.len());
        };

        match Header::from_be_bytes(*kind_buf) {
            ERR_KIND => {
                let detail = str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(detail.to_owned()))
            }
            REQUEST_KIND => Ok(Self::Request(from_json(rest)?)),
            REPLY_KIND => Ok(Self::Reply(from_json(rest)?)),
            BATCH_KIND => Ok(Self::Batch(deserialize_batch(rest)?)),
            kind => Self::invalid_kind(kind),
        }
    }
}
