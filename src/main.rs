/*!
 * cs-bench - Main Entry Point
 *
 * Simulation of concurrent bank withdrawals under a selectable
 * critical section method.
 */

use std::io;

fn main() {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let code = cs_bench::cli::run(
        std::env::args_os(),
        &mut stdout.lock(),
        &mut stderr.lock(),
    );
    std::process::exit(code);
}
