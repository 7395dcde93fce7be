//! Hospital and doctor management.

use carecart_client::{EntityKind, SavedEntity};
use carecart_core::admin::{AdminEntityDraft, DoctorDraft, HospitalDraft};
use carecart_core::Money;
use clap::{Args, Subcommand};

use crate::app::App;

#[derive(Subcommand)]
pub enum AdminAction {
    /// List hospitals
    Hospitals,
    /// List doctors, optionally at one hospital
    Doctors {
        #[arg(long)]
        hospital: Option<String>,
    },
    /// Create or update a hospital
    SaveHospital(HospitalArgs),
    /// Create or update a doctor
    SaveDoctor(DoctorArgs),
    /// Delete a hospital or doctor
    Delete {
        #[arg(value_enum)]
        kind: Kind,
        id: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum Kind {
    Hospital,
    Doctor,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Hospital => EntityKind::Hospital,
            Kind::Doctor => EntityKind::Doctor,
        }
    }
}

#[derive(Args)]
pub struct HospitalArgs {
    /// Existing id; omit to create
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    image_url: Option<String>,
}

#[derive(Args)]
pub struct DoctorArgs {
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    hospital_id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    specialization: String,
    #[arg(long, default_value_t = 0)]
    experience_years: u32,
    /// Consultation fee in rupees
    #[arg(long)]
    fee: i64,
    #[arg(long)]
    image_url: Option<String>,
}

pub async fn run(app: &App, action: AdminAction) -> anyhow::Result<()> {
    if !app.session.require()?.is_admin() {
        anyhow::bail!("this account is not an administrator");
    }
    let admin = app.admin();

    match action {
        AdminAction::Hospitals => {
            for h in admin.list_hospitals().await? {
                println!("  {:<10} {:<32} {:<16} {}", h.id, h.name, h.city, h.phone);
            }
        }
        AdminAction::Doctors { hospital } => {
            let doctors = match hospital {
                Some(id) => admin.doctors_at(&id).await?,
                None => admin.list_doctors().await?,
            };
            for d in doctors {
                println!(
                    "  {:<10} {:<28} {:<20} {:>10}",
                    d.id,
                    d.name,
                    d.specialization,
                    d.consultation_fee.to_string()
                );
            }
        }
        AdminAction::SaveHospital(args) => {
            let draft = AdminEntityDraft::Hospital(HospitalDraft {
                id: args.id,
                name: args.name,
                address: args.address,
                city: args.city,
                phone: args.phone,
                image_url: args.image_url,
            });
            print_saved(&admin.save(&draft).await?);
        }
        AdminAction::SaveDoctor(args) => {
            let draft = AdminEntityDraft::Doctor(DoctorDraft {
                id: args.id,
                hospital_id: args.hospital_id,
                name: args.name,
                specialization: args.specialization,
                experience_years: args.experience_years,
                consultation_fee: Money::from_rupees(args.fee),
                image_url: args.image_url,
            });
            print_saved(&admin.save(&draft).await?);
        }
        AdminAction::Delete { kind, id } => admin.delete(kind.into(), &id).await?,
    }
    Ok(())
}

fn print_saved(saved: &SavedEntity) {
    match saved {
        SavedEntity::Hospital(h) => println!("Hospital {} saved as {}", h.name, h.id),
        SavedEntity::Doctor(d) => println!("Doctor {} saved as {}", d.name, d.id),
    }
}
