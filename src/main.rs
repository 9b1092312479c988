use std::io::{self, Write};

use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

use verdex::{
    api::{AccountApi, HttpAccountApi},
    config::Config,
    error::FormErrors,
    otp::format_countdown,
    signup::{SignupFlow, SubmitOutcome, VerifyOutcome, REDIRECT_DELAY},
    validate::{validate_field, Field},
};

enum ModalResult {
    Registered,
    BackToForm,
    Aborted,
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();
    let mut flow = SignupFlow::new(HttpAccountApi::new(&config));

    println!("Verdex dashboard signup");
    for field in Field::ALL {
        collect_field(&mut flow, field);
    }

    loop {
        match flow.submit().await {
            SubmitOutcome::Invalid | SubmitOutcome::Failed => {
                if !rework_form(&mut flow) {
                    println!("Signup cancelled.");
                    return;
                }
            }
            SubmitOutcome::CodeSent => {
                println!("A 6-digit code was sent to {}.", flow.draft().email);
                match verification_loop(&mut flow).await {
                    ModalResult::Registered => return finish().await,
                    ModalResult::BackToForm => {
                        if !rework_form(&mut flow) {
                            println!("Signup cancelled.");
                            return;
                        }
                    }
                    ModalResult::Aborted => {
                        println!("Signup cancelled.");
                        return;
                    }
                }
            }
            SubmitOutcome::AccountCreated => return finish().await,
        }
    }
}

/// After a failed submit: shows the errors, re-prompts every field
/// the failure named, and — when it named none — waits for an
/// explicit go-ahead. Either way the next submit only happens on user
/// action; nothing retries on its own. Returns false to abandon.
fn rework_form<C: AccountApi>(flow: &mut SignupFlow<C>) -> bool {
    print_errors(flow);

    if needs_retry_confirmation(flow.errors()) {
        return prompt("Press Enter to try again (q = cancel)") != "q";
    }

    let invalid: Vec<Field> = flow.errors().fields.keys().copied().collect();
    for field in invalid {
        collect_field(flow, field);
    }
    true
}

/// A failure with no field errors (general or transport) leaves
/// nothing to re-collect, so the resubmit itself is the action that
/// needs confirming.
fn needs_retry_confirmation(errors: &FormErrors) -> bool {
    errors.fields.is_empty()
}

async fn verification_loop<C: AccountApi>(flow: &mut SignupFlow<C>) -> ModalResult {
    loop {
        let Some((remaining, error)) = flow
            .session()
            .map(|s| s.with(|s| (s.seconds_left(), s.error())))
        else {
            return ModalResult::BackToForm;
        };

        if let Some(message) = error {
            println!("{message}");
        }
        println!("[{}]", format_countdown(remaining));

        let input = prompt("Code (r = resend, q = cancel)");
        match input.as_str() {
            "q" => {
                flow.cancel_verification();
                return ModalResult::Aborted;
            }
            "r" => {
                if flow.drive_resend().await {
                    println!("A new code is on its way.");
                }
            }
            code => {
                if let Some(session) = flow.session() {
                    session.with(|s| s.paste(code));
                }
                match flow.drive_verify().await {
                    VerifyOutcome::AccountCreated => return ModalResult::Registered,
                    VerifyOutcome::RegisterFailed | VerifyOutcome::SessionClosed => {
                        return ModalResult::BackToForm
                    }
                    VerifyOutcome::CodeRejected => {}
                    VerifyOutcome::NotReady => println!("Enter all 6 digits of the code."),
                }
            }
        }
    }
}

fn collect_field<C: AccountApi>(flow: &mut SignupFlow<C>, field: Field) {
    loop {
        flow.set_field(field, &prompt(label(field)));
        match validate_field(field, flow.draft()) {
            Some(message) => println!("  {message}"),
            None => return,
        }
    }
}

fn print_errors<C: AccountApi>(flow: &SignupFlow<C>) {
    for (field, message) in &flow.errors().fields {
        println!("{}: {message}", label(*field));
    }
    if let Some(general) = &flow.errors().general {
        println!("{general}");
    }
}

async fn finish() {
    println!("Account created. Redirecting to login...");
    sleep(REDIRECT_DELAY).await;
    println!("Done. Log in with your new account.");
}

fn label(field: Field) -> &'static str {
    match field {
        Field::Name => "Name",
        Field::Email => "Email",
        Field::Phone => "Phone",
        Field::SecurityKey => "Security key",
        Field::Password => "Password",
        Field::ConfirmPassword => "Confirm password",
    }
}

fn prompt(text: &str) -> String {
    print!("{text}: ");
    io::stdout().flush().expect("stdout unavailable");

    let mut line = String::new();
    io::stdin().read_line(&mut line).expect("stdin closed");
    line.trim().to_string()
}
