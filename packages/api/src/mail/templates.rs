/// Booking confirmation email. Returns (html, text).
pub fn booking_confirmation(
    user_name: &str,
    specialist_name: &str,
    service_name: Option<&str>,
    date: &str,
    time_start: &str,
    price: i64,
    pending_confirmation: bool,
) -> (String, String) {
    let service_line = service_name.unwrap_or("Consultation");
    let status_line = if pending_confirmation {
        "We received your request and will confirm it shortly."
    } else {
        "Your appointment is confirmed."
    };

    let html = format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Your Sanara Appointment</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; background-color: #f6f5f2; color: #1f2421;">
    <table role="presentation" style="width: 100%; border-collapse: collapse;">
        <tr>
            <td style="padding: 40px 20px;">
                <table role="presentation" style="max-width: 600px; margin: 0 auto; background: #ffffff; border-radius: 16px; overflow: hidden; border: 1px solid #e5e2da;">
                    <tr>
                        <td style="padding: 32px 40px 20px; text-align: center; border-bottom: 1px solid #e5e2da;">
                            <span style="font-size: 24px; font-weight: 700; color: #3d6b50;">Sanara</span>
                            <h1 style="margin: 16px 0 0; font-size: 24px; font-weight: 700; line-height: 1.3;">
                                Thank you, {user_name}!
                            </h1>
                        </td>
                    </tr>
                    <tr>
                        <td style="padding: 32px 40px;">
                            <p style="margin: 0 0 24px; font-size: 16px; line-height: 1.6; color: #4b544d;">
                                {status_line}
                            </p>
                            <div style="background: #f6f5f2; border: 1px solid #e5e2da; border-radius: 12px; padding: 24px;">
                                <p style="margin: 0 0 8px; font-size: 15px;"><strong>Service:</strong> {service_line}</p>
                                <p style="margin: 0 0 8px; font-size: 15px;"><strong>Specialist:</strong> {specialist_name}</p>
                                <p style="margin: 0 0 8px; font-size: 15px;"><strong>Date:</strong> {date}, {time_start}</p>
                                <p style="margin: 0; font-size: 15px;"><strong>Price:</strong> {price}</p>
                            </div>
                        </td>
                    </tr>
                    <tr>
                        <td style="padding: 0 40px 32px; text-align: center;">
                            <p style="margin: 0; font-size: 13px; color: #8b928c;">
                                If you need to reschedule, reply to this email or call us.
                            </p>
                        </td>
                    </tr>
                </table>
            </td>
        </tr>
    </table>
</body>
</html>"##
    );

    let text = format!(
        "Thank you, {user_name}!\n\n{status_line}\n\nService: {service_line}\nSpecialist: {specialist_name}\nDate: {date}, {time_start}\nPrice: {price}\n\nIf you need to reschedule, reply to this email or call us.\n"
    );

    (html, text)
}
