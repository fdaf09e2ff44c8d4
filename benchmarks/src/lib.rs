//! Script fixtures shared by the Moonware benchmarks

/// Build a Luau script with `locals` declarations and a loop using each one
pub fn sample_script(locals: usize) -> String {
    let mut source = String::from("local Players = game:GetService(\"Players\")\n");
    for i in 0..locals {
        source.push_str(&format!("local value_{} = {}\n", i, i * 7));
    }
    source.push_str("local total = 0\nfor index = 1, 10 do\n");
    for i in 0..locals {
        source.push_str(&format!("    total = total + value_{} * index\n", i));
    }
    source.push_str("end\nprint(Players.LocalPlayer.Name, total)\n");
    source
}
