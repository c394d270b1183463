//! Aggregator API 模块
//!
//! 提供对外的 `Aggregator` 结构体，封装驱动连接、采集线程和状态同步细节。

use crate::calibration;
use crate::config::{AggregatorConfig, ConnectConfig};
use crate::error::DriverError;
use crate::haptics;
use crate::hooks::NotificationForwarder;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{Notification, ingest_loop};
use crate::singleton::InstanceGuard;
use crate::snapshot::{self, GloveSnapshot};
use crate::state::*;
use crossbeam_channel::Receiver;
use manus_link::{CoreSdk, StreamCallback};
use manus_protocol::{GestureLandscapeData, HandMotion, ManusHost, SdkReturnCode, Side};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程负责 join，主线程只等待有限时间
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // 看门狗继续运行，进程退出时由 OS 回收
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "Thread join timeout",
                )))
            },
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 单次连接尝试的结果
enum Attempt {
    Connected(ManusHost),
    /// 可以重试（找不到主机、`NotConnected` 等）
    Retry(DriverError),
    Fatal(DriverError),
}

/// 搜索主机并连接（单次）
fn try_connect(sdk: &dyn CoreSdk, config: &ConnectConfig) -> Attempt {
    if let Err(e) = sdk.look_for_hosts(config.look_for_hosts_seconds, config.loopback_only) {
        return Attempt::Retry(e.into());
    }

    let count = match sdk.number_of_available_hosts() {
        Ok(0) => return Attempt::Retry(DriverError::NoHostFound),
        Ok(count) => count as usize,
        Err(e) => return Attempt::Retry(e.into()),
    };

    let mut hosts = vec![ManusHost::default(); count];
    if let Err(e) = sdk.available_hosts(&mut hosts) {
        return Attempt::Retry(e.into());
    }

    let selected = match config.host_ip.as_deref() {
        None => {
            info!("Autoconnecting to the first host found");
            0
        },
        Some(ip) => {
            info!("Looking for host with IP address: {}", ip);
            hosts.iter().position(|h| h.ip() == ip).unwrap_or_else(|| {
                warn!("No host with IP {} found, connecting to the first host", ip);
                0
            })
        },
    };
    let host = hosts[selected];

    match sdk.connect_to_host(&host) {
        Ok(()) => Attempt::Connected(host),
        Err(e) if e.code == SdkReturnCode::NotConnected => Attempt::Retry(e.into()),
        Err(e) => Attempt::Fatal(e.into()),
    }
}

/// 连接到 Manus Core（按配置重试）
fn connect(sdk: &dyn CoreSdk, config: &ConnectConfig) -> Result<ManusHost, DriverError> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let last = match try_connect(sdk, config) {
            Attempt::Connected(host) => {
                info!(
                    "Connected to host {} ({}) after {} attempt(s)",
                    host.host_name(),
                    host.ip_address(),
                    attempts
                );
                return Ok(host);
            },
            Attempt::Fatal(e) => return Err(e),
            Attempt::Retry(e) => e,
        };

        let exhausted = config.max_attempts.is_some_and(|max| attempts >= max);
        if !config.retry || exhausted {
            return Err(match last {
                DriverError::Sdk(source) => DriverError::ConnectFailed { attempts, source },
                other => other,
            });
        }

        info!(
            "Could not connect ({}), trying again in {:?}",
            last,
            config.retry_interval()
        );
        std::thread::sleep(config.retry_interval());
    }
}

/// Manus 手套遥测聚合器（对外 API）
///
/// 驱动线程的回调只做转发，后台采集线程负责两阶段拉取和写入存储；
/// 消费线程通过 `get_snapshot` 等方法随时读取最新状态。
///
/// 同一进程内只能存在一个实例（见 [`InstanceGuard`]）。Drop 时按顺序拆除：
/// 注销回调 → 停止采集线程 → 振动归零 → 关闭驱动 → 清空存储 → 释放守卫。
pub struct Aggregator {
    /// 驱动（与采集线程共享）
    sdk: Arc<dyn CoreSdk>,
    /// 共享状态上下文
    ctx: Arc<AggregatorContext>,
    /// 采集线程句柄（Drop 时 join）
    ingest_thread: Option<JoinHandle<()>>,
    /// 运行标志（用于线程生命周期联动）
    is_running: Arc<AtomicBool>,
    config: AggregatorConfig,
    torn_down: bool,
    /// 最后一个字段：拆除完成后才释放
    _guard: InstanceGuard,
}

impl Aggregator {
    /// 创建聚合器并连接到 Manus Core
    ///
    /// # 参数
    /// - `sdk`: 驱动实现（会被移动到共享 `Arc` 中）
    /// - `config`: 聚合器配置
    ///
    /// # 错误
    /// - `DriverError::AlreadyInitialized`: 已有存活的实例（此时不会接触驱动）
    /// - `DriverError::InvalidConfig`: 配置错误
    /// - `DriverError::Sdk` / `DriverError::ConnectFailed`: 驱动初始化或连接失败
    pub fn new(sdk: impl CoreSdk + 'static, config: AggregatorConfig) -> Result<Self, DriverError> {
        let guard = InstanceGuard::acquire()?;
        config.validate()?;

        let sdk: Arc<dyn CoreSdk> = Arc::new(sdk);
        let ctx = Arc::new(AggregatorContext::new(CalibrationState::with_paths(
            config.calibration.left.clone(),
            config.calibration.right.clone(),
        )));

        let (tx, rx) = crossbeam_channel::bounded(config.pipeline.queue_capacity);
        let forwarder: Arc<dyn StreamCallback> = Arc::new(NotificationForwarder::new(
            tx,
            ctx.clone(),
            config.pipeline.forward_sdk_logs,
        ));

        sdk.register_log_callback(forwarder.clone())?;
        if let Err(e) = sdk.initialize(config.connect.connection_type) {
            let _ = sdk.unregister_callbacks();
            return Err(e.into());
        }
        info!("Manus SDK initialized ({:?})", config.connect.connection_type);

        // 从这里开始，任何失败都由 Drop 完成拆除
        let mut aggregator = Self {
            sdk,
            ctx,
            ingest_thread: None,
            is_running: Arc::new(AtomicBool::new(true)),
            config,
            torn_down: false,
            _guard: guard,
        };

        aggregator.ingest_thread = Some(aggregator.spawn_ingest(rx)?);
        aggregator.sdk.register_stream_callbacks(forwarder)?;

        let cs = aggregator.config.coordinate_system;
        aggregator.sdk.initialize_coordinate_system(cs.to_vuh(), cs.world_space)?;

        connect(aggregator.sdk.as_ref(), &aggregator.config.connect)?;

        if let Err(e) = aggregator.sdk.set_hand_motion(aggregator.config.hand_motion) {
            error!("Failed to set hand motion mode: {}", e);
        }

        info!("Manus Core connected");
        Ok(aggregator)
    }

    fn spawn_ingest(&self, rx: Receiver<Notification>) -> Result<JoinHandle<()>, DriverError> {
        let sdk = self.sdk.clone();
        let ctx = self.ctx.clone();
        let config = self.config.pipeline.clone();
        let is_running = self.is_running.clone();

        std::thread::Builder::new()
            .name("manus-ingest".into())
            .spawn(move || ingest_loop(sdk, rx, ctx, config, is_running))
            .map_err(|e| DriverError::IngestThread(e.to_string()))
    }

    // ------------------------------------------------------------------
    // 读取
    // ------------------------------------------------------------------

    /// 组装一只手套的快照
    ///
    /// 手套不在拓扑中、还没有骨骼数据或节点数为 0 时返回 `None`。
    pub fn get_snapshot(&self, device_id: u32) -> Option<GloveSnapshot> {
        snapshot::assemble(self.sdk.as_ref(), &self.ctx, device_id)
    }

    /// 有骨骼数据的手套 ID（升序）
    pub fn glove_ids(&self) -> Vec<u32> {
        self.ctx.telemetry.pose.ids()
    }

    /// 当前拓扑（提交后返回自有副本）
    pub fn landscape(&self) -> Option<Landscape> {
        self.ctx.commit_landscape().map(|landscape| (*landscape).clone())
    }

    /// 阻塞等待第一个拓扑
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时仍未收到拓扑
    pub fn wait_for_landscape(&self, timeout: Duration) -> Result<Landscape, DriverError> {
        let start = Instant::now();
        loop {
            if let Some(landscape) = self.ctx.commit_landscape() {
                return Ok((*landscape).clone());
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// 手套的节点拓扑（惰性拉取并缓存）
    ///
    /// # 错误
    /// - `DriverError::UnknownDevice`: 手套不在当前拓扑中
    /// - `DriverError::NoPoseDataYet`: 还没有该手套的骨骼帧
    pub fn hierarchy(&self, device_id: u32) -> Result<Vec<HierarchyEntry>, DriverError> {
        let entries = snapshot::get_hierarchy(self.sdk.as_ref(), &self.ctx, device_id)?;
        Ok(entries.as_ref().clone())
    }

    /// 手势表（数量来自当前拓扑）
    pub fn gestures(&self) -> Result<Vec<Gesture>, DriverError> {
        let count = self
            .ctx
            .commit_landscape()
            .map(|landscape| landscape.gesture_count as usize)
            .unwrap_or(0);
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![GestureLandscapeData::default(); count];
        self.sdk.gesture_landscape_data(&mut buffer)?;
        Ok(buffer.iter().map(|g| Gesture { id: g.id, name: g.name() }).collect())
    }

    pub fn hand_motion(&self) -> Result<HandMotion, DriverError> {
        Ok(self.sdk.hand_motion()?)
    }

    pub fn set_hand_motion(&self, motion: HandMotion) -> Result<(), DriverError> {
        self.sdk.set_hand_motion(motion)?;
        info!("Hand motion set to {:?}", motion);
        Ok(())
    }

    /// 获取采集指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 采集线程是否仍在运行
    pub fn is_healthy(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
            && self.ingest_thread.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // 副作用操作
    // ------------------------------------------------------------------

    /// 发送振动（最多 5 个强度，规整到 [0, 1]）
    ///
    /// 手套不存在或不带振动时静默忽略；返回驱动是否接受了命令。
    pub fn vibrate(&self, device_id: u32, powers: &[f32]) -> bool {
        haptics::vibrate(self.sdk.as_ref(), &self.ctx, device_id, powers)
    }

    /// 为一只手套加载校准文件
    pub fn load_calibration(&self, device_id: u32, side: Side, path: impl AsRef<Path>) -> bool {
        calibration::load_calibration(self.sdk.as_ref(), &self.ctx, device_id, side, path.as_ref())
    }

    /// 为拓扑中尚未加载的一侧加载已配置的校准文件，返回新加载的侧数
    pub fn load_all_pending(&self) -> usize {
        calibration::load_all_pending(self.sdk.as_ref(), &self.ctx)
    }

    /// 校准状态副本
    pub fn calibration_state(&self) -> CalibrationState {
        self.ctx.calibration.lock().clone()
    }

    // ------------------------------------------------------------------
    // 拆除
    // ------------------------------------------------------------------

    /// 显式拆除（等价于 Drop）
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!("Shutting down Manus aggregator");

        // 1. 注销回调：之后驱动不再推送
        if let Err(e) = self.sdk.unregister_callbacks() {
            warn!("Failed to unregister callbacks: {}", e);
        }

        // 2. 停止采集线程
        // Release: 之前的所有写入对看到 false 的线程可见
        self.is_running.store(false, Ordering::Release);
        let join_timeout = self.config.pipeline.join_timeout();
        if let Some(handle) = self.ingest_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Ingestion thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        // 3. 振动归零
        if let Some(landscape) = self.ctx.commit_landscape() {
            haptics::stop_all(self.sdk.as_ref(), &landscape);
        }

        // 4. 关闭驱动
        match self.sdk.shut_down() {
            Ok(()) => debug!("Manus SDK shut down"),
            Err(e) => warn!("Failed to shut down SDK: {}", e),
        }

        // 5. 清空存储，之后到达的写入全部忽略
        self.ctx.close();
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        self.teardown();
        // 6. 守卫随字段一起释放
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("glove_ids", &self.glove_ids())
            .field("metrics", &self.metrics())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manus_link::call;
    use manus_link::mock::MockCoreSdk;
    use serial_test::serial;

    fn fast_config() -> AggregatorConfig {
        let mut config = AggregatorConfig::default();
        config.connect.retry_interval_ms = 1;
        config.pipeline.receive_timeout_ms = 5;
        config
    }

    #[test]
    fn test_connect_prefers_matching_ip() {
        let sdk = MockCoreSdk::new();
        sdk.set_hosts(vec![
            ManusHost::with_address("a", "10.0.0.1:9004"),
            ManusHost::with_address("b", "10.0.0.2:9004"),
        ]);
        let config = ConnectConfig { host_ip: Some("10.0.0.2".into()), ..Default::default() };
        let host = connect(&sdk, &config).unwrap();
        assert_eq!(host.host_name(), "b");
    }

    #[test]
    fn test_connect_falls_back_to_first_host() {
        let sdk = MockCoreSdk::new();
        sdk.set_hosts(vec![
            ManusHost::with_address("a", "10.0.0.1"),
            ManusHost::with_address("b", "10.0.0.2"),
        ]);
        let config = ConnectConfig { host_ip: Some("192.168.0.9".into()), ..Default::default() };
        assert_eq!(connect(&sdk, &config).unwrap().host_name(), "a");
    }

    #[test]
    fn test_connect_retries_not_connected() {
        let sdk = MockCoreSdk::new();
        sdk.set_connect_failures(2);
        let config = ConnectConfig { retry_interval_ms: 1, ..Default::default() };
        assert!(connect(&sdk, &config).is_ok());
        assert_eq!(sdk.call_count(call::CONNECT_TO_HOST), 3);
    }

    #[test]
    fn test_connect_gives_up_after_max_attempts() {
        let sdk = MockCoreSdk::new();
        sdk.set_connect_failures(10);
        let config = ConnectConfig {
            retry_interval_ms: 1,
            max_attempts: Some(3),
            ..Default::default()
        };
        let err = connect(&sdk, &config).unwrap_err();
        assert!(matches!(err, DriverError::ConnectFailed { attempts: 3, .. }));
        assert_eq!(sdk.call_count(call::CONNECT_TO_HOST), 3);
    }

    #[test]
    fn test_connect_without_retry() {
        let sdk = MockCoreSdk::new();
        sdk.set_hosts(Vec::new());
        let config = ConnectConfig { retry: false, ..Default::default() };
        assert!(matches!(connect(&sdk, &config), Err(DriverError::NoHostFound)));
        assert_eq!(sdk.call_count(call::CONNECT_TO_HOST), 0);
    }

    #[test]
    fn test_connect_fatal_error_not_retried() {
        let sdk = MockCoreSdk::new();
        sdk.fail(call::CONNECT_TO_HOST, SdkReturnCode::InvalidArgument);
        let config = ConnectConfig { retry_interval_ms: 1, ..Default::default() };
        let err = connect(&sdk, &config).unwrap_err();
        assert_eq!(err.sdk_code(), Some(SdkReturnCode::InvalidArgument));
        assert_eq!(sdk.call_count(call::CONNECT_TO_HOST), 1);
    }

    #[test]
    #[serial]
    fn test_aggregator_new_and_drop() {
        let sdk = MockCoreSdk::new();
        let aggregator = Aggregator::new(sdk.clone(), fast_config()).unwrap();
        assert!(aggregator.is_healthy());
        assert!(sdk.has_stream_callback());
        assert!(sdk.connected_host().is_some());

        drop(aggregator);
        assert!(sdk.is_shut_down());
        assert!(!sdk.has_stream_callback());
        assert!(!InstanceGuard::is_held());
    }

    #[test]
    #[serial]
    fn test_failed_connect_tears_down() {
        let sdk = MockCoreSdk::new();
        sdk.set_connect_failures(5);
        let mut config = fast_config();
        config.connect.max_attempts = Some(2);

        let err = Aggregator::new(sdk.clone(), config).unwrap_err();
        assert!(matches!(err, DriverError::ConnectFailed { .. }));
        assert!(sdk.is_shut_down());
        assert!(!InstanceGuard::is_held());
    }

    #[test]
    #[serial]
    fn test_failed_initialize_releases_guard() {
        let sdk = MockCoreSdk::new();
        sdk.fail(call::INITIALIZE_INTEGRATED, SdkReturnCode::InternalError);
        let err = Aggregator::new(sdk.clone(), fast_config()).unwrap_err();
        assert_eq!(err.sdk_code(), Some(SdkReturnCode::InternalError));
        assert_eq!(sdk.call_count(call::SHUT_DOWN), 0);
        assert!(!InstanceGuard::is_held());
    }
}
