use crate::dedup::Fingerprint;
use crate::errors::{Result, SeqlinkError};
use crate::storage::Mapping;
use migration::entities::short_url_map;

/// 将 Sea-ORM Model 转换为 Mapping
pub fn model_to_mapping(model: short_url_map::Model) -> Result<Mapping> {
    let id = u64::try_from(model.id).map_err(|_| {
        SeqlinkError::store(format!("row for token '{}' has negative id {}", model.token, model.id))
    })?;
    Ok(Mapping {
        id,
        fingerprint: Fingerprint::from_hex(&model.fingerprint)?,
        long_url: model.long_url,
        token: model.token,
        created_at: model.created_at,
    })
}

/// 将 Mapping 转换为 ActiveModel（仅用于插入，映射不可变）
pub fn mapping_to_active_model(mapping: &Mapping) -> Result<short_url_map::ActiveModel> {
    use sea_orm::ActiveValue::*;

    // 数据库列是有符号 BIGINT
    let id = i64::try_from(mapping.id).map_err(|_| {
        SeqlinkError::store(format!("id {} does not fit in a BIGINT column", mapping.id))
    })?;

    Ok(short_url_map::ActiveModel {
        id: Set(id),
        long_url: Set(mapping.long_url.clone()),
        fingerprint: Set(mapping.fingerprint.to_hex()),
        token: Set(mapping.token.clone()),
        created_at: Set(mapping.created_at),
    })
}
