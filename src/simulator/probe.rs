// src/simulator/probe.rs - Simulated wireless temperature probe
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::{Clock, elapsed_ms};
use crate::config::SimConfig;
use crate::control::TrendAnalyzer;
use crate::hardware::{Thermometer, sfloat};

use super::wiring::SimWiring;

/// Radio state shared by the supervisor's [`SimProbe`] and the [`ProbeRadio`] task.
#[derive(Debug, Default)]
pub struct ProbeLink {
    scanning: AtomicBool,
    started_ms: AtomicU32,
    connect_ms: u32,
}

impl ProbeLink {
    pub fn new(connect_ms: u32) -> Arc<Self> {
        Arc::new(Self {
            connect_ms,
            ..Self::default()
        })
    }

    pub fn is_connected(&self, now_ms: u32) -> bool {
        self.scanning.load(Ordering::Acquire)
            && elapsed_ms(now_ms, self.started_ms.load(Ordering::Relaxed)) >= self.connect_ms
    }
}

/// The supervisor's view of the probe.
pub struct SimProbe<C> {
    link: Arc<ProbeLink>,
    clock: C,
}

impl<C: Clock> SimProbe<C> {
    pub fn new(link: Arc<ProbeLink>, clock: C) -> Self {
        Self { link, clock }
    }
}

impl<C: Clock> Thermometer for SimProbe<C> {
    fn start(&mut self) {
        if self.link.scanning.load(Ordering::Acquire) {
            return;
        }
        tracing::info!("SimProbe scanning");
        self.link.started_ms.store(self.clock.now_ms(), Ordering::Relaxed);
        self.link.scanning.store(true, Ordering::Release);
    }

    fn stop(&mut self) {
        tracing::info!("SimProbe stopped");
        self.link.scanning.store(false, Ordering::Release);
    }

    fn connected(&self) -> bool {
        self.link.is_connected(self.clock.now_ms())
    }
}

/// The probe's side of the link: samples the water and notifies the analyzer.
pub struct ProbeRadio<C> {
    link: Arc<ProbeLink>,
    wiring: Arc<SimWiring>,
    analyzer: TrendAnalyzer,
    clock: C,
    rng: StdRng,
    noise_c: f32,
    samples: u64,
}

impl<C: Clock> ProbeRadio<C> {
    pub fn new(
        link: Arc<ProbeLink>,
        wiring: Arc<SimWiring>,
        analyzer: TrendAnalyzer,
        clock: C,
        config: &SimConfig,
    ) -> Self {
        Self {
            link,
            wiring,
            analyzer,
            clock,
            rng: StdRng::seed_from_u64(config.seed),
            noise_c: config.probe_noise_c,
            samples: 0,
        }
    }

    /// Take one measurement if connected. Returns the value delivered to the analyzer.
    pub fn sample(&mut self) -> Option<f32> {
        let now = self.clock.now_ms();
        if !self.link.is_connected(now) {
            return None;
        }

        let noise = if self.noise_c > 0.0 {
            self.rng.random_range(-self.noise_c..=self.noise_c)
        } else {
            0.0
        };
        let payload = sfloat::encode(self.wiring.water_temp() + noise);
        match sfloat::decode(&payload) {
            Ok(temp) => {
                tracing::trace!("Probe notification {:.2}°C at {}ms", temp, now);
                self.analyzer.add_reading(temp, now);
                self.samples += 1;
                Some(temp)
            }
            Err(e) => {
                tracing::warn!("Dropping probe notification: {}", e);
                None
            }
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn analyzer(&self) -> &TrendAnalyzer {
        &self.analyzer
    }
}

/// Drive `radio` every `interval_ms` until the task is aborted.
pub async fn run_probe<C: Clock>(mut radio: ProbeRadio<C>, interval_ms: u32) {
    let mut ticker = tokio::time::interval(Duration::from_millis(u64::from(interval_ms)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        radio.sample();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn radio(
        clock: &Arc<ManualClock>,
        wiring: &Arc<SimWiring>,
        link: &Arc<ProbeLink>,
    ) -> ProbeRadio<Arc<ManualClock>> {
        let config = SimConfig {
            probe_noise_c: 0.0,
            ..SimConfig::default()
        };
        ProbeRadio::new(
            link.clone(),
            wiring.clone(),
            TrendAnalyzer::new(),
            clock.clone(),
            &config,
        )
    }

    #[test]
    fn test_probe_connects_after_delay() {
        let clock = Arc::new(ManualClock::new(1_000));
        let link = ProbeLink::new(2_000);
        let mut probe = SimProbe::new(link.clone(), clock.clone());
        assert!(!probe.connected());

        probe.start();
        clock.advance(1_999);
        assert!(!probe.connected());
        clock.advance(1);
        assert!(probe.connected());

        // Restarting while already scanning does not reset the connection.
        probe.start();
        assert!(probe.connected());

        probe.stop();
        assert!(!probe.connected());
    }

    #[test]
    fn test_radio_feeds_analyzer_only_when_connected() {
        let clock = Arc::new(ManualClock::new(0));
        let wiring = SimWiring::new();
        let link = ProbeLink::new(0);
        let mut radio = radio(&clock, &wiring, &link);
        let estimate = radio.analyzer().estimate();
        wiring.set_water_temp(42.5);

        assert_eq!(radio.sample(), None);

        SimProbe::new(link.clone(), clock.clone()).start();
        clock.set(1_000);
        let delivered = radio.sample().unwrap();
        assert!((delivered - 42.5).abs() < 1e-4);
        clock.set(2_000);
        wiring.set_water_temp(43.5);
        radio.sample();

        assert_eq!(radio.samples(), 2);
        assert_eq!(estimate.last_update_ms(), 2_000);
        assert!((estimate.slope() - 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_noise_is_bounded_and_reproducible() {
        let clock = Arc::new(ManualClock::new(0));
        let wiring = SimWiring::new();
        let link = ProbeLink::new(0);
        SimProbe::new(link.clone(), clock.clone()).start();
        wiring.set_water_temp(60.0);

        let config = SimConfig::default();
        let new_radio = || {
            ProbeRadio::new(
                link.clone(),
                wiring.clone(),
                TrendAnalyzer::new(),
                clock.clone(),
                &config,
            )
        };
        let mut a = new_radio();
        let mut b = new_radio();
        for t in 0..20 {
            clock.set(t * 1_000);
            let sa = a.sample().unwrap();
            let sb = b.sample().unwrap();
            assert_eq!(sa, sb);
            // Noise plus the codec's 0.01°C resolution
            assert!((sa - 60.0).abs() <= config.probe_noise_c + 0.006);
        }
    }
}
