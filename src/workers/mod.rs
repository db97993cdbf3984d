// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供后台任务处理和工作器管理功能：
/// 队列轮询、周期调度、通知与审计的异步分发，以及统一的启动和关闭。
pub mod manager;
pub mod scan_worker;
pub mod schedule_worker;
pub mod side_effect_dispatcher;
pub mod worker;

pub use manager::WorkerManager;
pub use scan_worker::ScanWorker;
pub use schedule_worker::ScheduleWorker;
pub use side_effect_dispatcher::{SideEffect, SideEffectDispatcher};
pub use worker::Worker;
