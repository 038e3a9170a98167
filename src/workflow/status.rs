// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use tracing::info;

/// Progress sink for long-running workflow steps.
pub trait StatusReporter: Send + Sync {
    fn start(&self, step: &str);
    fn done(&self);
}

/// Reports progress through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn start(&self, step: &str) {
        info!("{}", step);
    }

    fn done(&self) {
        info!("Done");
    }
}
