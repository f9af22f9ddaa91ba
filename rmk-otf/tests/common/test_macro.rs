extern crate rmk_otf;

// a rust macro to map a keycode name to its hid usage id
#[macro_export]
macro_rules! kc8 {
    ($key: ident) => {
        rmk_otf::KeyCode::$key as u8
    };
}

// a rust macro to create a list of key events, each is [row, col, keycode, pressed]
#[macro_export]
macro_rules! key_events {
    ($([$row:expr, $col:expr, $key:ident, $pressed:expr]),* $(,)?) => {
        vec![
            $(
                rmk_otf::event::KeyEvent::key($row, $col, rmk_otf::KeyCode::$key, $pressed),
            )*
        ]
    };
}

// a rust macro to create a key report that simulates key status change in hid
#[macro_export]
macro_rules! key_report {
    ($([$modifier:expr, $keys:expr]),* $(,)?) => {
        vec![
            $(
                rmk_otf::hid::KeyboardReport {
                    modifier: $modifier,
                    keycodes: $keys,
                    leds: 0,
                    reserved: 0,
                },
            )*
        ]
    };
}
