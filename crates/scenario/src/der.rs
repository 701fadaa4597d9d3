//! DER serialization of recorded scenarios
//!
//! Wire format, version 0:
//!
//! ```text
//! SEQUENCE {
//!   INTEGER version = 0
//!   SEQUENCE OF item
//! }
//! item ::= OCTET STRING (command bytes)
//!        | SEQUENCE OF INTEGER (expected status words)
//!        | SET { INTEGER level, UTF8String message }
//! ```
//!
//! Items of unknown tag are ignored on decode. Inside a log SET, an
//! absent level defaults to TRACE and an absent message to "".

use std::collections::BTreeSet;

use cardware_apdu_core::CommandApdu;
use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::item::{LogEntry, LogLevel, ScenarioItem};
use crate::{Error, Result, Scenario};

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_UTF8_STRING: u8 = 0x0C;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_SET: u8 = 0x31;

fn tag(number: u8) -> Result<Tag> {
    Tag::try_from(number).map_err(Error::from)
}

/// Minimal unsigned DER INTEGER content for `value`.
fn encode_integer(value: u32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(3);
    let mut content = bytes[skip..].to_vec();
    if content[0] & 0x80 != 0 {
        content.insert(0, 0x00);
    }
    content
}

/// Decode an unsigned DER INTEGER content.
fn decode_integer(content: &[u8]) -> Result<u32> {
    let (first, rest) = content.split_first().ok_or(Error::Der("empty INTEGER"))?;
    if *first & 0x80 != 0 {
        return Err(Error::Der("negative INTEGER"));
    }
    let digits = if *first == 0 { rest } else { content };
    if digits.len() > 4 {
        return Err(Error::Der("INTEGER out of range"));
    }
    Ok(digits.iter().fold(0, |acc, b| (acc << 8) | u32::from(*b)))
}

/// The primitive content of `tlv` when it carries the given tag.
fn primitive<'a>(tlv: &'a Tlv, number: u8) -> Result<Option<&'a [u8]>> {
    if tlv.tag() != &tag(number)? {
        return Ok(None);
    }
    match tlv.value() {
        Value::Primitive(bytes) => Ok(Some(bytes)),
        Value::Constructed(_) => Ok(None),
    }
}

/// The child TLVs of `tlv` when it carries the given constructed tag.
fn constructed<'a>(tlv: &'a Tlv, number: u8) -> Result<Option<&'a [Tlv]>> {
    if tlv.tag() != &tag(number)? {
        return Ok(None);
    }
    match tlv.value() {
        Value::Primitive(_) => Ok(None),
        Value::Constructed(children) => Ok(Some(children)),
    }
}

fn encode_item(item: &ScenarioItem) -> Result<Tlv> {
    let tlv = match item {
        ScenarioItem::Command(command) => Tlv::new(
            tag(TAG_OCTET_STRING)?,
            Value::Primitive(command.to_bytes().to_vec()),
        )?,
        ScenarioItem::ExpectedStatus(status_words) => {
            let mut entries = Vec::with_capacity(status_words.len());
            for sw in status_words {
                entries.push(Tlv::new(
                    tag(TAG_INTEGER)?,
                    Value::Primitive(encode_integer(u32::from(*sw))),
                )?);
            }
            Tlv::new(tag(TAG_SEQUENCE)?, Value::Constructed(entries))?
        }
        ScenarioItem::Log(entry) => {
            let level = Tlv::new(
                tag(TAG_INTEGER)?,
                Value::Primitive(encode_integer(entry.level().as_u32())),
            )?;
            let message = Tlv::new(
                tag(TAG_UTF8_STRING)?,
                Value::Primitive(entry.message().as_bytes().to_vec()),
            )?;
            Tlv::new(tag(TAG_SET)?, Value::Constructed(vec![level, message]))?
        }
    };
    Ok(tlv)
}

fn decode_expected_status(children: &[Tlv]) -> Result<BTreeSet<u16>> {
    let mut status_words = BTreeSet::new();
    for child in children {
        let Some(content) = primitive(child, TAG_INTEGER)? else {
            continue;
        };
        let sw = decode_integer(content)?;
        let sw = u16::try_from(sw).map_err(|_| Error::Der("status word out of range"))?;
        status_words.insert(sw);
    }
    Ok(status_words)
}

fn decode_log(children: &[Tlv]) -> Result<LogEntry> {
    let mut level = LogLevel::default();
    let mut message = String::new();
    for child in children {
        if let Some(content) = primitive(child, TAG_INTEGER)? {
            level = LogLevel::try_from(decode_integer(content)?)?;
        } else if let Some(content) = primitive(child, TAG_UTF8_STRING)? {
            message = String::from_utf8(content.to_vec())
                .map_err(|_| Error::Der("log message is not UTF-8"))?;
        }
    }
    Ok(LogEntry::new(level, message))
}

fn decode_item(tlv: &Tlv) -> Result<Option<ScenarioItem>> {
    if let Some(content) = primitive(tlv, TAG_OCTET_STRING)? {
        let command = CommandApdu::from_bytes(content).map_err(Error::Core)?;
        return Ok(Some(ScenarioItem::Command(command)));
    }
    if let Some(children) = constructed(tlv, TAG_SEQUENCE)? {
        return Ok(Some(ScenarioItem::ExpectedStatus(decode_expected_status(
            children,
        )?)));
    }
    if let Some(children) = constructed(tlv, TAG_SET)? {
        return Ok(Some(ScenarioItem::Log(decode_log(children)?)));
    }
    Ok(None)
}

pub(crate) fn encode(scenario: &Scenario) -> Result<Vec<u8>> {
    let version = Tlv::new(
        tag(TAG_INTEGER)?,
        Value::Primitive(encode_integer(Scenario::VERSION)),
    )?;
    let mut items = Vec::with_capacity(scenario.items().len());
    for item in scenario.items() {
        items.push(encode_item(item)?);
    }
    let items = Tlv::new(tag(TAG_SEQUENCE)?, Value::Constructed(items))?;
    let root = Tlv::new(tag(TAG_SEQUENCE)?, Value::Constructed(vec![version, items]))?;
    Ok(root.to_vec())
}

pub(crate) fn decode(input: &[u8]) -> Result<Scenario> {
    let root = Tlv::from_bytes(input)?;
    let children = constructed(&root, TAG_SEQUENCE)?
        .ok_or(Error::Der("scenario is not a SEQUENCE"))?;
    let mut children = children.iter();

    let version_tlv = children.next().ok_or(Error::Der("version missing"))?;
    let version = decode_integer(
        primitive(version_tlv, TAG_INTEGER)?.ok_or(Error::Der("version is not an INTEGER"))?,
    )?;
    if version != Scenario::VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let items_tlv = children.next().ok_or(Error::Der("item sequence missing"))?;
    let item_tlvs = constructed(items_tlv, TAG_SEQUENCE)?
        .ok_or(Error::Der("items are not a SEQUENCE"))?;

    let mut items = Vec::with_capacity(item_tlvs.len());
    for tlv in item_tlvs {
        if let Some(item) = decode_item(tlv)? {
            items.push(item);
        }
    }
    Ok(Scenario::new(items))
}
