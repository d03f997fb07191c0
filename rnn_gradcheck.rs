use rust_recurrent_layers::config::{load_config, GradCheckConfig};
use rust_recurrent_layers::layers::{
    recurrent_backward, recurrent_forward, temporal_affine_backward, temporal_affine_forward,
    temporal_softmax_loss, word_embedding_backward, word_embedding_forward, RecurrentParams,
};
use rust_recurrent_layers::utils::{
    eval_numerical_gradient, eval_numerical_gradient_array, rel_error, SimpleRng,
};
use rust_recurrent_layers::{Result, Tensor};
use std::env;
use std::process;

// Compare every analytic gradient in the library against centered finite
// differences on a small random problem.

// One named comparison.
struct Check {
    name: String,
    error: f64,
}

fn check(name: &str, analytic: &Tensor, numeric: &Tensor) -> Result<Check> {
    Ok(Check {
        name: name.to_string(),
        error: rel_error(analytic, numeric)?,
    })
}

fn recurrent_checks(cfg: &GradCheckConfig, rng: &mut SimpleRng) -> Result<Vec<Check>> {
    let (n, t, d, h) = (cfg.batch_size, cfg.seq_len, cfg.input_dim, cfg.hidden_dim);
    let cell = cfg.cell_type;
    let eps = cfg.epsilon;

    let x = rng.normal_tensor(&[n, t, d], 1.0);
    let h0 = rng.normal_tensor(&[n, h], 1.0);
    let params = RecurrentParams::new_random(cell, d, h, cfg.weight_scale, rng);
    let dout = rng.normal_tensor(&[n, t, h], 1.0);

    let (_, cache) = recurrent_forward(cell, &x, &h0, &params)?;
    let grads = recurrent_backward(&dout, &cache)?;

    let dx_num = eval_numerical_gradient_array(
        |x| recurrent_forward(cell, x, &h0, &params).map(|(out, _)| out),
        &x,
        &dout,
        eps,
    )?;
    let dh0_num = eval_numerical_gradient_array(
        |h0| recurrent_forward(cell, &x, h0, &params).map(|(out, _)| out),
        &h0,
        &dout,
        eps,
    )?;
    let dwx_num = eval_numerical_gradient_array(
        |wx| {
            let p = RecurrentParams {
                wx: wx.clone(),
                ..params.clone()
            };
            let (out, _) = recurrent_forward(cell, &x, &h0, &p)?;
            Ok(out)
        },
        &params.wx,
        &dout,
        eps,
    )?;
    let dwh_num = eval_numerical_gradient_array(
        |wh| {
            let p = RecurrentParams {
                wh: wh.clone(),
                ..params.clone()
            };
            let (out, _) = recurrent_forward(cell, &x, &h0, &p)?;
            Ok(out)
        },
        &params.wh,
        &dout,
        eps,
    )?;
    let db_num = eval_numerical_gradient_array(
        |b| {
            let p = RecurrentParams {
                b: b.clone(),
                ..params.clone()
            };
            let (out, _) = recurrent_forward(cell, &x, &h0, &p)?;
            Ok(out)
        },
        &params.b,
        &dout,
        eps,
    )?;

    let prefix = format!("{:?}", cell).to_lowercase();
    Ok(vec![
        check(&format!("{}_backward dx", prefix), &grads.dx, &dx_num)?,
        check(&format!("{}_backward dh0", prefix), &grads.dh0, &dh0_num)?,
        check(&format!("{}_backward dWx", prefix), &grads.dwx, &dwx_num)?,
        check(&format!("{}_backward dWh", prefix), &grads.dwh, &dwh_num)?,
        check(&format!("{}_backward db", prefix), &grads.db, &db_num)?,
    ])
}

fn embedding_checks(cfg: &GradCheckConfig, rng: &mut SimpleRng) -> Result<Vec<Check>> {
    let (n, t, d, v) = (cfg.batch_size, cfg.seq_len, cfg.input_dim, cfg.vocab_size);
    let x = rng.index_tensor(&[n, t], v);
    let w = rng.normal_tensor(&[v, d], 1.0);
    let dout = rng.normal_tensor(&[n, t, d], 1.0);

    let (_, cache) = word_embedding_forward(&x, &w)?;
    let dw = word_embedding_backward(&dout, &cache)?;
    let dw_num = eval_numerical_gradient_array(
        |w| word_embedding_forward(&x, w).map(|(out, _)| out),
        &w,
        &dout,
        cfg.epsilon,
    )?;

    Ok(vec![check("word_embedding_backward dW", &dw, &dw_num)?])
}

fn affine_checks(cfg: &GradCheckConfig, rng: &mut SimpleRng) -> Result<Vec<Check>> {
    let (n, t, d, m) = (cfg.batch_size, cfg.seq_len, cfg.hidden_dim, cfg.vocab_size);
    let x = rng.normal_tensor(&[n, t, d], 1.0);
    let w = rng.normal_tensor(&[d, m], 1.0);
    let b = rng.normal_tensor(&[m], 1.0);
    let dout = rng.normal_tensor(&[n, t, m], 1.0);

    let (_, cache) = temporal_affine_forward(&x, &w, &b)?;
    let grads = temporal_affine_backward(&dout, &cache)?;
    let eps = cfg.epsilon;

    let dx_num = eval_numerical_gradient_array(
        |x| temporal_affine_forward(x, &w, &b).map(|(out, _)| out),
        &x,
        &dout,
        eps,
    )?;
    let dw_num = eval_numerical_gradient_array(
        |w| temporal_affine_forward(&x, w, &b).map(|(out, _)| out),
        &w,
        &dout,
        eps,
    )?;
    let db_num = eval_numerical_gradient_array(
        |b| temporal_affine_forward(&x, &w, b).map(|(out, _)| out),
        &b,
        &dout,
        eps,
    )?;

    Ok(vec![
        check("temporal_affine_backward dx", &grads.dx, &dx_num)?,
        check("temporal_affine_backward dw", &grads.dw, &dw_num)?,
        check("temporal_affine_backward db", &grads.db, &db_num)?,
    ])
}

fn loss_checks(cfg: &GradCheckConfig, rng: &mut SimpleRng) -> Result<Vec<Check>> {
    let (n, t, v) = (cfg.batch_size, cfg.seq_len, cfg.vocab_size);
    let x = rng.normal_tensor(&[n, t, v], 1.0);
    let y = rng.index_tensor(&[n, t], v);
    let mask = rng.mask_tensor(&[n, t], 0.7);

    let (_, dx) = temporal_softmax_loss(&x, &y, &mask)?;
    let dx_num = eval_numerical_gradient(
        |x| temporal_softmax_loss(x, &y, &mask).map(|(loss, _)| loss),
        &x,
        cfg.epsilon,
    )?;

    Ok(vec![check("temporal_softmax_loss dx", &dx, &dx_num)?])
}

fn run(cfg: &GradCheckConfig) -> Result<Vec<Check>> {
    let mut rng = SimpleRng::new(cfg.seed);
    let mut checks = recurrent_checks(cfg, &mut rng)?;
    checks.extend(embedding_checks(cfg, &mut rng)?);
    checks.extend(affine_checks(cfg, &mut rng)?);
    checks.extend(loss_checks(cfg, &mut rng)?);
    Ok(checks)
}

fn main() {
    let cfg = match env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Failed to load config {}: {}", path, err);
                process::exit(2);
            }
        },
        None => GradCheckConfig::default(),
    };

    println!(
        "Gradient check: cell={:?} N={} T={} D={} H={} V={} (h={:e}, tol={:e})",
        cfg.cell_type,
        cfg.batch_size,
        cfg.seq_len,
        cfg.input_dim,
        cfg.hidden_dim,
        cfg.vocab_size,
        cfg.epsilon,
        cfg.tolerance
    );

    let checks = match run(&cfg) {
        Ok(checks) => checks,
        Err(err) => {
            eprintln!("Gradient check aborted: {}", err);
            process::exit(2);
        }
    };

    let mut failures = 0;
    for c in &checks {
        let status = if c.error <= cfg.tolerance {
            "ok"
        } else {
            failures += 1;
            "FAIL"
        };
        println!("{:<32} rel error {:>10.3e}  {}", c.name, c.error, status);
    }

    if failures > 0 {
        eprintln!("{} of {} gradients exceeded tolerance", failures, checks.len());
        process::exit(1);
    }
}
