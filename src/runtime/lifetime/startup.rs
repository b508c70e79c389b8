use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::blacklist::BlacklistFilter;
use crate::cache::{self, ExistenceFilter, GuardFactory};
use crate::codec::Codec;
use crate::config::StaticConfig;
use crate::sequence::SequenceAllocator;
use crate::services::{ConversionOptions, ConversionService, ResolutionService};
use crate::storage::{SeaOrmStorage, StorageFactory};

/// 重建 guard 时每批读取的 token 数
const GUARD_REBUILD_BATCH_SIZE: u64 = 1000;

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub codec: Arc<Codec>,
    pub guard: Arc<dyn ExistenceFilter>,
    pub conversion: Arc<ConversionService>,
    pub resolution: Arc<ResolutionService>,
}

/// 按静态配置构建所有组件
///
/// 顺序：配置校验 → 存储（含迁移）→ codec / 黑名单 → guard 预热 → 缓存 → 编排器
pub async fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    config.validate().context("Invalid configuration")?;

    let storage = StorageFactory::create_with(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let codec = Arc::new(
        Codec::from_alphabet_str(&config.codec.alphabet).context("Failed to build codec")?,
    );
    let blacklist = Arc::new(BlacklistFilter::with_codec(
        config.conversion.blacklist.iter().cloned(),
        &codec,
    ));

    let guard = GuardFactory::create(&config.guard)
        .await
        .context("Failed to create existence guard")?;
    if !guard.is_persistent() || config.guard.rebuild_on_startup {
        warm_guard(&storage, guard.as_ref(), config)
            .await
            .context("Failed to populate existence guard")?;
    } else {
        debug!("Existence guard is persistent, skipping startup rebuild");
    }

    let object_cache = cache::create_object_cache(&config.cache);

    let sequence = Arc::new(SequenceAllocator::new(
        storage.clone(),
        config.conversion.sequence_key.clone(),
    ));

    let conversion = Arc::new(ConversionService::new(
        codec.clone(),
        blacklist,
        sequence,
        storage.clone(),
        guard.clone(),
        ConversionOptions {
            max_encode_retries: config.conversion.max_encode_retries,
            short_domain: config.conversion.short_domain.clone(),
        },
    ));

    let resolution = Arc::new(ResolutionService::new(
        codec.clone(),
        guard.clone(),
        object_cache,
        storage.clone(),
    ));

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        storage,
        codec,
        guard,
        conversion,
        resolution,
    })
}

/// 从数据库中已有的 token 重建 guard
///
/// 容量取已有映射数与配置容量的较大值，给后续写入留出空间。
pub async fn warm_guard(
    storage: &SeaOrmStorage,
    guard: &dyn ExistenceFilter,
    config: &StaticConfig,
) -> Result<usize> {
    let stored = storage
        .count_mappings()
        .await
        .context("Failed to count stored mappings")?;
    let stored = usize::try_from(stored).unwrap_or(usize::MAX);
    let capacity = stored.max(config.guard.capacity);

    if stored > config.guard.capacity {
        warn!(
            "Stored mappings ({}) exceed guard.capacity ({}); sizing guard by stored count",
            stored, config.guard.capacity
        );
    }

    guard
        .rebuild_streaming(
            capacity,
            config.guard.fp_rate,
            storage.stream_tokens(GUARD_REBUILD_BATCH_SIZE),
        )
        .await?;

    info!(
        "Existence guard populated with {} tokens (capacity {})",
        stored, capacity
    );
    Ok(stored)
}
