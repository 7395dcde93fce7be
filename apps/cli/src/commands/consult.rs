//! Consultation booking: details, OTP, payment.

use anyhow::Context;
use carecart_client::{ClientError, CommerceBackend};
use carecart_core::consultation::{BookingPhase, ConsultationForm};

use crate::app::App;
use crate::terminal::{prompt, prompt_required};

pub async fn run(app: &App, doctor_id: &str) -> anyhow::Result<()> {
    let session = app.session.require()?;
    let doctor = app
        .backend
        .list_doctors(&session.token)
        .await?
        .into_iter()
        .find(|d| d.id == doctor_id)
        .with_context(|| format!("no doctor with id {doctor_id}"))?;

    println!(
        "{}, {} ({} years), fee {}",
        doctor.name, doctor.specialization, doctor.experience_years, doctor.consultation_fee
    );
    let booking = app.booking(doctor)?;
    println!("Slots: {}", booking.time_slots().join(" "));

    loop {
        booking.set_form(ConsultationForm {
            patient_name: prompt_required("Patient name").await?,
            email: prompt_required("Email").await?,
            phone: prompt_required("Phone").await?,
            date: prompt_required("Date (YYYY-MM-DD)").await?,
            time: prompt_required("Time").await?,
            reason: prompt_required("Reason").await?,
        });
        match booking.send_otp().await {
            Ok(()) => break,
            Err(e @ (ClientError::Validation(_) | ClientError::Http { .. })) => {
                println!("{e}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    println!("OTP sent. Type the code, or 'resend'.");

    while booking.phase() == BookingPhase::Otp {
        let answer = prompt("OTP").await?;
        let result = if answer.eq_ignore_ascii_case("resend") {
            booking.regenerate_otp().await
        } else {
            booking.paste_otp(&answer);
            booking.verify_otp().await
        };
        if let Err(e) = result {
            if e.is_auth() {
                return Err(e.into());
            }
            println!("{e}");
            booking.clear_otp();
        }
    }

    match booking.pay().await? {
        BookingPhase::Completed => println!("Consultation booked"),
        BookingPhase::Cancelled => println!("Payment cancelled"),
        phase => {
            let state = booking.state();
            println!("Booking {phase}: {}", state.error().unwrap_or("payment failed"));
        }
    }
    Ok(())
}
