use crate::settings::Settings;

pub fn ping(settings: &Settings) -> Result<(), anyhow::Error> {
    let deadline = settings.rules.payment_deadline;
    println!("OK - CLI running");
    println!("Exit tax rate:        {}", settings.tax_rate);
    println!("Deemed disposal every {} years", settings.rules.cycle_length_years);
    println!("Payment deadline:     {:02}-{:02} of the disposal year", deadline.month(), deadline.day());
    println!("Environment:          {} ({})", settings.t212_environment, settings.t212_base_url);
    println!("Credentials set:      {}", settings.has_credentials());
    println!("Database:             {}", settings.database_url);
    Ok(())
}
