/// 在进程启动时把 Existence Guard 实现注册进插件表
///
/// `$ty` 需要提供 `async fn create(config: GuardConfig) -> Result<Self>`。
#[macro_export]
macro_rules! declare_existence_filter_plugin {
    ($name:expr, $ty:ty) => {
        #[ctor::ctor]
        fn __register_existence_filter_plugin() {
            use std::sync::Arc;
            use $crate::cache::register::register_filter_plugin;
            register_filter_plugin(
                $name,
                Arc::new(|config: $crate::config::GuardConfig| {
                    Box::pin(async move {
                        let filter = <$ty>::create(config).await?;
                        Ok(Box::new(filter) as Box<dyn $crate::cache::traits::ExistenceFilter>)
                    })
                }),
            );
        }
    };
}
