//! OMCI request builders.
//!
//! Every builder produces the full 44-byte baseline frame and returns it as
//! the lowercase hex string handed to the OpenOLT `OmciMsgOut` RPC. No CRC
//! is generated; the trailer closes the frame.

use crate::schema::{AttributeDef, MeDefinition, MeRegistry};

use super::error::OmciError;
use super::{layout, AttributeValue, AttributeValues, MessageType};

/// Assemble a baseline frame around `contents` (zero-padded to 32 bytes).
fn frame(
    tid: u16,
    message_type: MessageType,
    class_id: u16,
    instance_id: u16,
    contents: &[u8],
) -> Result<Vec<u8>, OmciError> {
    if contents.len() > layout::CONTENTS_LEN {
        return Err(OmciError::Serialize {
            limit: layout::CONTENTS_LEN,
            actual: contents.len(),
        });
    }

    let mut out = vec![0u8; layout::FRAME_LEN];
    out[layout::TID_RANGE].copy_from_slice(&tid.to_be_bytes());
    out[layout::MESSAGE_TYPE_OFFSET] = message_type.byte();
    out[layout::DEVICE_ID_OFFSET] = layout::BASELINE_DEVICE_ID;
    out[layout::CLASS_RANGE].copy_from_slice(&class_id.to_be_bytes());
    out[layout::INSTANCE_RANGE].copy_from_slice(&instance_id.to_be_bytes());
    out[layout::CONTENTS_RANGE.start..layout::CONTENTS_RANGE.start + contents.len()]
        .copy_from_slice(contents);
    out[layout::TRAILER_RANGE].copy_from_slice(&layout::TRAILER);
    Ok(out)
}

fn frame_hex(
    tid: u16,
    message_type: MessageType,
    class_id: u16,
    instance_id: u16,
    contents: &[u8],
) -> Result<String, OmciError> {
    frame(tid, message_type, class_id, instance_id, contents).map(hex::encode)
}

/// Encode one attribute value at its schema width.
fn encode_value(attr: &AttributeDef, value: &AttributeValue) -> Vec<u8> {
    let mut out = vec![0u8; attr.size];
    match value {
        AttributeValue::Integer(v) => {
            let be = v.to_be_bytes();
            let width = attr.size.min(be.len());
            out[attr.size - width..].copy_from_slice(&be[be.len() - width..]);
        }
        AttributeValue::Text(text) => {
            let bytes = text.as_bytes();
            let width = attr.size.min(bytes.len());
            out[..width].copy_from_slice(&bytes[..width]);
        }
        AttributeValue::Bytes(bytes) => {
            let width = attr.size.min(bytes.len());
            out[..width].copy_from_slice(&bytes[..width]);
        }
    }
    out
}

/// Serialise `values` in attribute-index order; the returned mask is the
/// union of the encoded attributes' mask bits.
fn encode_attributes(def: &MeDefinition, values: &AttributeValues) -> (u16, Vec<u8>) {
    let mut mask = 0u16;
    let mut encoded = Vec::new();
    for attr in def.attributes {
        if let Some(value) = values.get(attr.name) {
            mask |= attr.mask();
            encoded.extend_from_slice(&encode_value(attr, value));
        }
    }
    (mask, encoded)
}

/// Set ONU-G AdministrativeState to 0 (unlock).
pub fn set_admin_state0(tid: u16) -> Result<String, OmciError> {
    let mut contents = Vec::with_capacity(3);
    contents.extend_from_slice(&0x0200u16.to_be_bytes());
    contents.push(0);
    frame_hex(
        tid,
        MessageType::SetRequest,
        layout::ONU_G_CLASS_ID,
        0,
        &contents,
    )
}

/// Set a T-CONT's AllocId to 42.
pub fn set_alloc_id(tid: u16, instance_id: u16) -> Result<String, OmciError> {
    let mut contents = Vec::with_capacity(4);
    contents.extend_from_slice(&0x8000u16.to_be_bytes());
    contents.extend_from_slice(&42u16.to_be_bytes());
    frame_hex(
        tid,
        MessageType::SetRequest,
        layout::T_CONT_CLASS_ID,
        instance_id,
        &contents,
    )
}

/// Get every readable attribute of the given entity.
pub fn get_request(
    registry: &MeRegistry,
    tid: u16,
    instance_id: u16,
    class_id: u16,
) -> Result<String, OmciError> {
    let def = registry
        .me(class_id)
        .ok_or(OmciError::UnknownClass(class_id))?;
    frame_hex(
        tid,
        MessageType::GetRequest,
        class_id,
        instance_id,
        &def.allowed_attribute_mask().to_be_bytes(),
    )
}

/// Set the attributes named in `attributes_text` on the given entity.
pub fn set_request(
    registry: &MeRegistry,
    tid: u16,
    instance_id: u16,
    class_id: u16,
    attributes_text: &str,
) -> Result<String, OmciError> {
    let def = registry
        .me(class_id)
        .ok_or(OmciError::UnknownClass(class_id))?;
    let values = super::attributes::parse(attributes_text, def)?;
    let (mask, encoded) = encode_attributes(def, &values);

    let mut contents = Vec::with_capacity(2 + encoded.len());
    contents.extend_from_slice(&mask.to_be_bytes());
    contents.extend_from_slice(&encoded);
    frame_hex(
        tid,
        MessageType::SetRequest,
        class_id,
        instance_id,
        &contents,
    )
}

/// Create an entity with the attributes named in `attributes_text`.
pub fn create_request(
    registry: &MeRegistry,
    tid: u16,
    instance_id: u16,
    class_id: u16,
    attributes_text: &str,
) -> Result<String, OmciError> {
    let def = registry
        .me(class_id)
        .ok_or(OmciError::UnknownClass(class_id))?;
    let values = super::attributes::parse(attributes_text, def)?;
    let (_, encoded) = encode_attributes(def, &values);
    frame_hex(
        tid,
        MessageType::CreateRequest,
        class_id,
        instance_id,
        &encoded,
    )
}

/// Delete the given entity instance.
pub fn delete_request(tid: u16, instance_id: u16, class_id: u16) -> Result<String, OmciError> {
    frame_hex(tid, MessageType::DeleteRequest, class_id, instance_id, &[])
}

/// Reset the ONU's MIB.
pub fn mib_reset_request(tid: u16) -> Result<String, OmciError> {
    frame_hex(
        tid,
        MessageType::MibResetRequest,
        layout::ONU_DATA_CLASS_ID,
        0,
        &[],
    )
}

/// Open a MIB upload.
pub fn mib_upload_request(tid: u16) -> Result<String, OmciError> {
    frame_hex(
        tid,
        MessageType::MibUploadRequest,
        layout::ONU_DATA_CLASS_ID,
        0,
        &[],
    )
}

/// Request the next MIB upload slice.
pub fn mib_upload_next_request(tid: u16, sequence: u16) -> Result<String, OmciError> {
    frame_hex(
        tid,
        MessageType::MibUploadNextRequest,
        layout::ONU_DATA_CLASS_ID,
        0,
        &sequence.to_be_bytes(),
    )
}

/// Reboot the ONU (condition 0: unconditional).
pub fn reboot_request(tid: u16) -> Result<String, OmciError> {
    frame_hex(
        tid,
        MessageType::RebootRequest,
        layout::ONU_G_CLASS_ID,
        0,
        &[0],
    )
}

/// Retrieve the ONU's alarm status (retrieval mode 0).
pub fn get_all_alarms_request(tid: u16) -> Result<String, OmciError> {
    frame_hex(
        tid,
        MessageType::GetAllAlarmsRequest,
        layout::ONU_DATA_CLASS_ID,
        0,
        &[0],
    )
}
