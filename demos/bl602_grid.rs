#![no_std]
#![no_main]

use ws2812b_matrix::*;

use bl602::{Bl602Pins, McycleTimer};
use colors as c;
use grid::LedGrid;

use panic_halt as _;

// 8x8 panel, rows snake back and forth starting at the top left:
const PANEL: PhysicalGrid = PhysicalGrid {
    columns: 8,
    rows: 8,
    wiring: Wiring::ZIGZAG_ODD,
    color_order: ColorOrder::GRB,
    strip_timings: StripTimings::WS2812B,
};
const NUM_LEDS: usize = PANEL.led_count();

const DATA_PIN: u8 = 0;

// core clock left running by the bootloader
const SYSCLK_HZ: u32 = 160_000_000;

const HEART: &str = "\
 RR  RR
RRRRRRRR
RRRRRRRR
RRRRRRRR
 RRRRRR
  RRRR
   RR
";

#[riscv_rt::entry]
fn main() -> ! {
    let mut pins = Bl602Pins::take().unwrap();
    let timer = McycleTimer::new(SYSCLK_HZ);

    // set aside memory for the panel
    let mut color_buffer: [c::Color; NUM_LEDS] = [c::C_OFF; NUM_LEDS];
    let mut panel = LedGrid::new(&mut pins, DATA_PIN, timer, &mut color_buffer, &PANEL).unwrap();

    let mut palette = c::Palette::<4>::new();
    palette.add_color('R', c::C_RED).unwrap();

    let sweep = [c::C_RED, c::C_ORANGE, c::C_YELLOW, c::C_GREEN, c::C_SKY_BLUE, c::C_BLUE, c::C_PURPLE];
    let mut frame = 0;
    let mut last_time = riscv::register::mcycle::read64();
    loop {
        // one step every quarter second:
        if riscv::register::mcycle::read64() - last_time < u64::from(SYSCLK_HZ / 4) {
            continue;
        }
        last_time = riscv::register::mcycle::read64();

        panel.set_all(c::C_OFF);
        if frame < PANEL.columns {
            panel.set_column(frame, sweep[frame % sweep.len()]).ok();
        } else if frame < PANEL.columns + PANEL.rows {
            panel.set_row(frame - PANEL.columns, c::C_WHITE).ok();
        } else {
            panel.render(HEART, &palette).ok();
        }
        panel.sync();

        frame = (frame + 1) % (PANEL.columns + PANEL.rows + 4);
    }
}
