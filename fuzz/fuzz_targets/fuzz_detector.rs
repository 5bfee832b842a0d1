#![no_main]
use kegmon_core::{ChangeDetection, Channel, FilterBank, FilterParams};
use libfuzzer_sys::fuzz_target;

// Arbitrary (channel, dt, weight) ticks through the bank and state machine.
fuzz_target!(|ticks: Vec<(u8, u16, f32)>| {
    let Ok(mut m) = ChangeDetection::builder().try_build() else {
        return;
    };
    let mut banks: [FilterBank; 4] = std::array::from_fn(|_| FilterBank::new(&FilterParams::default()));
    let mut ts = 0u64;
    for (ch, dt, kg) in ticks {
        let ch = Channel::ALL[usize::from(ch) % Channel::ALL.len()];
        ts += u64::from(dt);
        let reading = banks[ch.index()].update(kg);
        m.update(ch, &reading, ts);
        let _ = m.confidence_at(ch, ts);
    }
    while m.get_next_event().is_some() {}
});
